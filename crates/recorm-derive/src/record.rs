//! Record derive macro implementation

use crate::attrs::{parse_field_attr, parse_record_attr};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let record_attr = parse_record_attr(&input)?;

    let mut field_defs = Vec::new();
    let mut value_arms = Vec::new();
    let mut id_field = None;

    for field in fields {
        let attr = parse_field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_name = ident.unraw().to_string();
        let ty = &field.ty;

        let semantic = if attr.reference {
            quote! { ::recorm::SemanticType::Ref }
        } else {
            quote! { <#ty as ::recorm::FieldType>::semantic_type() }
        };
        let mut def = quote! { ::recorm::FieldDef::new(#field_name, #semantic) };

        if attr.is_id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Record allows only one #[orm(id)] field",
                ));
            }
            id_field = Some(ident.clone());
            def = quote! { #def.id() };
        }
        let column = attr
            .column
            .clone()
            .or_else(|| record_attr.rename_all.map(|rule| rule.apply(&field_name)));
        if let Some(column) = column {
            def = quote! { #def.column(#column) };
        }
        if attr.currency {
            def = quote! { #def.currency() };
        }
        if let Some((total, fractional)) = attr.precision {
            def = quote! { #def.precision(#total, #fractional) };
        }
        if let Some(nullable) = attr.nullable {
            def = quote! { #def.nullable(#nullable) };
        }

        field_defs.push(quote! { .field(#def) });
        value_arms.push(quote! {
            #field_name => ::core::option::Option::Some(::recorm::FieldType::to_value(&self.#ident)),
        });
    }

    let Some(id_ident) = id_field else {
        return Err(syn::Error::new_spanned(
            &input,
            "Record requires one field marked #[orm(id)]",
        ));
    };

    let record_name = name.unraw().to_string();
    let table = record_attr.table.map(|table| quote! { .table(#table) });

    Ok(quote! {
        impl #impl_generics ::recorm::FieldValues for #name #ty_generics #where_clause {
            fn field_value(&self, field: &str) -> ::core::option::Option<::recorm::Value> {
                match field {
                    #(#value_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::recorm::Record for #name #ty_generics #where_clause {
            fn schema() -> ::recorm::RecordSchema {
                ::recorm::RecordSchema::new(#record_name)
                    #table
                    #(#field_defs)*
            }

            fn set_identity(&mut self, id: i64) -> ::recorm::OrmResult<()> {
                self.#id_ident = ::recorm::FieldType::from_value(::recorm::Value::Int(id))?;
                ::core::result::Result::Ok(())
            }
        }
    })
}
