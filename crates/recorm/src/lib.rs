//! # recorm
//!
//! Typed records to single-table SQL, for SQL Server and SQLite.
//!
//! ## Features
//!
//! - **Predicates, not strings**: filters are small boolean trees over a record, compiled to
//!   parenthesized SQL with named bindings
//! - **Metadata once**: each record type is resolved (column order, identity, handlers) once
//!   per process and cached
//! - **Pluggable types**: per-type storage declaration and value conversion through a
//!   handler registry
//! - **Dialect profiles**: quoting, identity syntax and inserted-row retrieval are data, so a
//!   new backend is a new `Dialect` value
//! - **No I/O**: statements come back as SQL text plus bindings; executing them is up to you
//! - **In-memory tables**: the same predicates evaluated in process, for tests
//!
//! ```ignore
//! use recorm::prelude::*;
//! use recorm::predicate::{null, param, row};
//!
//! #[derive(Record, Clone, Default)]
//! #[orm(table = "DbModel")]
//! struct Item {
//!     #[orm(id, column = "ID")]
//!     id: i64,
//!     #[orm(column = "Key")]
//!     key: Option<String>,
//!     #[orm(column = "Value")]
//!     value: i64,
//!     #[orm(column = "Active")]
//!     active: bool,
//! }
//!
//! let sql = TableSql::for_record::<Item>(&Dialect::SQL_SERVER)?;
//!
//! let p = row("key").eq(null()).or(row("value").gt(2)).and(row("active").eq(true));
//! assert_eq!(
//!     sql.where_clause(&p)?.where_clause(),
//!     "WHERE ((([Key] IS NULL) OR ([Value] > 2)) AND ([Active] = 1))"
//! );
//!
//! let example = Item { key: Some("Hello World".into()), ..Default::default() };
//! let stmt = sql.select_where_with(&row("key").eq(param("key")), &example)?;
//! assert!(stmt.sql.ends_with("WHERE ([Key] = @Key);"));
//! # Ok::<(), recorm::OrmError>(())
//! ```

// Lets `#[derive(Record)]` output name `::recorm` from inside this crate too.
extern crate self as recorm;

pub mod compile;
pub mod config;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod memory;
pub mod meta;
pub mod predicate;
pub mod prelude;
pub mod record;
pub mod statement;
pub mod types;
pub mod value;

pub use compile::{Binding, CompiledFragment, Compiler, DeferredParam, compile};
pub use config::{MemoryConfig, SqlLogConfig};
pub use dialect::{DatabaseScripts, Dialect, InsertedRow, TypeNames};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, QuoteStyle};
pub use memory::{MemoryTable, TableObserver};
pub use meta::{Column, FieldDef, RecordSchema, TableMeta, resolve_schema};
pub use predicate::Predicate;
pub use record::{FieldValues, Record};
pub use statement::{Statement, StatementKind, TableSql};
pub use types::{
    Modifiers, Precision, SemanticType, TypeFamily, TypeHandler, TypeRegistry,
};
pub use value::{FieldType, Value};

#[cfg(feature = "derive")]
pub use recorm_derive::Record;
