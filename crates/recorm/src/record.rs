//! Record traits.
//!
//! [`Record`] is normally derived:
//!
//! ```ignore
//! use recorm::Record;
//!
//! #[derive(Record, Clone, Default)]
//! #[orm(table = "Items")]
//! struct Item {
//!     #[orm(id)]
//!     id: i64,
//!     #[orm(column = "Key")]
//!     key: String,
//!     #[orm(currency)]
//!     price: f64,
//! }
//! ```

use crate::error::OrmResult;
use crate::meta::{RecordSchema, TableMeta};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read access to field values by declared field name.
///
/// This is all the compiler needs from a bound parameter, so parameters can be
/// records, update payloads or plain maps.
pub trait FieldValues {
    /// The logical value of `field`, or `None` if the type has no such field.
    fn field_value(&self, field: &str) -> Option<Value>;
}

impl<T: FieldValues + ?Sized> FieldValues for &T {
    fn field_value(&self, field: &str) -> Option<Value> {
        (**self).field_value(field)
    }
}

impl FieldValues for HashMap<String, Value> {
    fn field_value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

impl FieldValues for BTreeMap<String, Value> {
    fn field_value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

/// A typed record persisted to a single table.
pub trait Record: FieldValues + Sized + 'static {
    /// Describe the record's fields. Resolved once per type by [`Record::meta`].
    fn schema() -> RecordSchema;

    /// Store a newly assigned identity value.
    fn set_identity(&mut self, id: i64) -> OrmResult<()>;

    /// Cached, resolved metadata for this record type.
    fn meta() -> OrmResult<Arc<TableMeta>> {
        crate::meta::meta::<Self>()
    }
}
