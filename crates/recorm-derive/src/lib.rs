//! Derive macros for recorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod record;

/// Derive `FieldValues` and `Record` for a struct.
///
/// # Example
///
/// ```ignore
/// use recorm::Record;
///
/// #[derive(Record, Clone, Default)]
/// #[orm(table = "Orders", rename_all = "PascalCase")]
/// struct Order {
///     #[orm(id)]
///     id: i64,
///     customer: String,
///     #[orm(currency)]
///     total: f64,
///     #[orm(reference, column = "ShipperId")]
///     shipper: i64,
///     #[orm(skip)]
///     dirty: bool,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the struct name)
/// - `#[orm(rename_all = "PascalCase")]` - Derive storage names from field names
///   (`PascalCase`, `camelCase`, `snake_case`, `SCREAMING_SNAKE_CASE`)
/// - `#[orm(id)]` - The identity field (exactly one, settable from an `i64`)
/// - `#[orm(column = "name")]` - Storage name override
/// - `#[orm(currency)]` / `#[orm(precision(19, 4))]` - Fixed-point decimal storage
/// - `#[orm(nullable)]` / `#[orm(not_null)]` - Explicit column nullability
/// - `#[orm(reference)]` - Integer id of a row in another table
/// - `#[orm(skip)]` - Not persisted
///
/// Field types must implement `recorm::FieldType`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
