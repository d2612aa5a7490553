//! Convenient imports for typical `recorm` usage.
//!
//! ```ignore
//! use recorm::prelude::*;
//! ```

pub use crate::predicate::{always, never, null, param, row};
pub use crate::{
    Dialect, FieldValues, MemoryTable, OrmError, OrmResult, Predicate, Record, Statement,
    TableSql, Value,
};
