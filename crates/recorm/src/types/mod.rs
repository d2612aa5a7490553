//! Semantic types, column modifiers and the type handler registry.
//!
//! Every persisted field has a [`SemanticType`]. The [`TypeRegistry`] maps each
//! semantic type to a [`TypeHandler`] which knows how to declare the column in a
//! given dialect and how to move values between their logical and stored forms.
//!
//! ```ignore
//! use recorm::types::{Modifiers, SemanticType, TypeRegistry};
//! use recorm::Dialect;
//!
//! let handler = TypeRegistry::global().handler_for(SemanticType::Real)?;
//! assert_eq!(handler.storage_type(&Dialect::SQL_SERVER, &Modifiers::currency()), "DECIMAL(19, 4)");
//! # Ok::<(), recorm::OrmError>(())
//! ```

mod handlers;

pub use handlers::{
    BoolHandler, IntHandler, JsonHandler, RealHandler, RefHandler, TextHandler, TimestampHandler,
    UuidHandler,
};

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// The semantic type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Bool,
    Int,
    Real,
    Text,
    /// Nullable integer id of a row in another table.
    Ref,
    Uuid,
    Timestamp,
    Json,
    /// Application-defined type; needs a handler registered under the same name.
    Custom(&'static str),
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Bool => f.write_str("bool"),
            SemanticType::Int => f.write_str("int"),
            SemanticType::Real => f.write_str("real"),
            SemanticType::Text => f.write_str("text"),
            SemanticType::Ref => f.write_str("ref"),
            SemanticType::Uuid => f.write_str("uuid"),
            SemanticType::Timestamp => f.write_str("timestamp"),
            SemanticType::Json => f.write_str("json"),
            SemanticType::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// Comparison family of a column; two operands are comparable only within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Boolean,
    Numeric,
    Text,
    Identifier,
    Temporal,
    Document,
}

impl TypeFamily {
    /// Whether a (non-null) logical value may be compared against a column of this family.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (TypeFamily::Boolean, Value::Bool(_)) => true,
            (TypeFamily::Numeric, Value::Int(_) | Value::Real(_)) => true,
            (TypeFamily::Text, Value::Text(_)) => true,
            (TypeFamily::Identifier, Value::Uuid(_) | Value::Text(_)) => true,
            (TypeFamily::Temporal, Value::Timestamp(_) | Value::Text(_)) => true,
            (TypeFamily::Document, Value::Json(_) | Value::Text(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeFamily::Boolean => "boolean",
            TypeFamily::Numeric => "numeric",
            TypeFamily::Text => "text",
            TypeFamily::Identifier => "identifier",
            TypeFamily::Temporal => "temporal",
            TypeFamily::Document => "document",
        };
        f.write_str(name)
    }
}

/// Total and fractional digits of a fixed-point decimal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub total: u8,
    pub fractional: u8,
}

impl Precision {
    pub const fn new(total: u8, fractional: u8) -> Self {
        Self { total, fractional }
    }

    /// Precision used for currency columns unless one is given explicitly.
    pub const CURRENCY: Precision = Precision::new(19, 4);
}

/// Optional per-field storage modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Explicit decimal precision. Wins over `currency` when both are set.
    pub precision: Option<Precision>,
    /// Currency column with its decimal precision.
    pub currency: Option<Precision>,
    /// `Some(true)` renders `NULL`, `Some(false)` renders `NOT NULL`.
    pub nullable: Option<bool>,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modifiers for a currency column with the default currency precision.
    pub fn currency() -> Self {
        Self::default().with_currency(Precision::CURRENCY)
    }

    pub fn with_precision(mut self, total: u8, fractional: u8) -> Self {
        self.precision = Some(Precision::new(total, fractional));
        self
    }

    pub fn with_currency(mut self, precision: Precision) -> Self {
        self.currency = Some(precision);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// The decimal precision to declare, explicit precision first.
    pub fn decimal_precision(&self) -> Option<Precision> {
        self.precision.or(self.currency)
    }
}

/// Per-semantic-type storage behaviour.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Comparison family used for compile-time type checks.
    fn family(&self) -> TypeFamily;

    /// Column type declaration for `dialect`, without nullability.
    fn storage_type(&self, dialect: &Dialect, modifiers: &Modifiers) -> String;

    /// Logical value to the value bound on the wire.
    fn serialize(&self, value: &Value) -> OrmResult<Value>;

    /// Wire value back to its logical form.
    fn deserialize(&self, value: &Value) -> OrmResult<Value>;
}

/// Lookup table from semantic type to handler.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    handlers: HashMap<SemanticType, Arc<dyn TypeHandler>>,
}

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with handlers for every built-in semantic type.
    pub fn builtin() -> Self {
        Self::new()
            .with(SemanticType::Bool, BoolHandler)
            .with(SemanticType::Int, IntHandler)
            .with(SemanticType::Real, RealHandler)
            .with(SemanticType::Text, TextHandler)
            .with(SemanticType::Ref, RefHandler)
            .with(SemanticType::Uuid, UuidHandler)
            .with(SemanticType::Timestamp, TimestampHandler)
            .with(SemanticType::Json, JsonHandler)
    }

    /// The process-wide registry used by cached metadata resolution.
    ///
    /// Defaults to [`TypeRegistry::builtin`] unless [`TypeRegistry::install_global`]
    /// ran first.
    pub fn global() -> &'static TypeRegistry {
        GLOBAL_REGISTRY.get_or_init(TypeRegistry::builtin)
    }

    /// Install `registry` as the process-wide registry.
    ///
    /// Fails once the global registry has been initialized, either by an earlier
    /// install or by the first metadata resolution.
    pub fn install_global(registry: TypeRegistry) -> OrmResult<()> {
        GLOBAL_REGISTRY.set(registry).map_err(|_| {
            OrmError::validation("global type registry is already initialized")
        })
    }

    /// Register (or replace) the handler for `ty`.
    pub fn register(&mut self, ty: SemanticType, handler: impl TypeHandler + 'static) {
        self.handlers.insert(ty, Arc::new(handler));
    }

    /// Builder-style [`TypeRegistry::register`].
    pub fn with(mut self, ty: SemanticType, handler: impl TypeHandler + 'static) -> Self {
        self.register(ty, handler);
        self
    }

    pub fn contains(&self, ty: SemanticType) -> bool {
        self.handlers.contains_key(&ty)
    }

    /// The handler for `ty`, or `UnsupportedType`.
    pub fn handler_for(&self, ty: SemanticType) -> OrmResult<Arc<dyn TypeHandler>> {
        self.handlers
            .get(&ty)
            .cloned()
            .ok_or_else(|| OrmError::UnsupportedType(format!("no handler registered for {ty}")))
    }
}
