//! Attribute parsing for the `Record` derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use syn::{DeriveInput, Field, LitInt, LitStr, Result, Token};

/// Case conversion applied to field names that have no explicit `column`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RenameRule {
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "PascalCase" => Ok(Self::Pascal),
            "camelCase" => Ok(Self::Camel),
            "snake_case" => Ok(Self::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnake),
            other => Err(syn::Error::new_spanned(
                lit,
                format!(
                    "unknown rename rule `{other}`; expected PascalCase, camelCase, snake_case or SCREAMING_SNAKE_CASE"
                ),
            )),
        }
    }

    pub(crate) fn apply(self, name: &str) -> String {
        match self {
            Self::Pascal => name.to_pascal_case(),
            Self::Camel => name.to_lower_camel_case(),
            Self::Snake => name.to_snake_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
        }
    }
}

/// `#[orm(table = "...", rename_all = "...")]` on the struct.
#[derive(Default)]
pub(crate) struct RecordAttr {
    pub table: Option<String>,
    pub rename_all: Option<RenameRule>,
}

pub(crate) fn parse_record_attr(input: &DeriveInput) -> Result<RecordAttr> {
    let mut out = RecordAttr::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                out.table = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename_all = Some(RenameRule::parse(&lit)?);
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute; expected `table` or `rename_all`"))
            }
        })?;
    }
    Ok(out)
}

/// Field-level `#[orm(...)]` flags.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: Option<String>,
    pub currency: bool,
    pub precision: Option<(u8, u8)>,
    pub nullable: Option<bool>,
    pub reference: bool,
    pub skip: bool,
}

pub(crate) fn parse_field_attr(field: &Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("id") {
                out.is_id = true;
            } else if path.is_ident("column") {
                out.column = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("currency") {
                out.currency = true;
            } else if path.is_ident("precision") {
                // precision(total, fractional)
                let content;
                syn::parenthesized!(content in meta.input);
                let total: LitInt = content.parse()?;
                content.parse::<Token![,]>()?;
                let fractional: LitInt = content.parse()?;
                out.precision = Some((total.base10_parse()?, fractional.base10_parse()?));
            } else if path.is_ident("nullable") {
                set_nullable(&mut out, true, &meta)?;
            } else if path.is_ident("not_null") {
                set_nullable(&mut out, false, &meta)?;
            } else if path.is_ident("reference") {
                out.reference = true;
            } else if path.is_ident("skip") {
                out.skip = true;
            } else {
                return Err(meta.error(
                    "unsupported field attribute; expected one of `id`, `column`, `currency`, \
                     `precision`, `nullable`, `not_null`, `reference`, `skip`",
                ));
            }
            Ok(())
        })?;
    }

    if out.skip && out.is_id {
        return Err(syn::Error::new_spanned(
            field,
            "the identity field cannot be skipped",
        ));
    }
    Ok(out)
}

fn set_nullable(
    out: &mut FieldAttr,
    nullable: bool,
    meta: &syn::meta::ParseNestedMeta<'_>,
) -> Result<()> {
    if out.nullable.is_some_and(|n| n != nullable) {
        return Err(meta.error("`nullable` and `not_null` are mutually exclusive"));
    }
    out.nullable = Some(nullable);
    Ok(())
}
