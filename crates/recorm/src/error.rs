//! Error types for recorm

use thiserror::Error;

/// Result type alias for recorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types raised while describing records and building statements.
///
/// Every variant is raised synchronously while metadata is resolved or SQL is
/// compiled; none of them describe a transient condition, so none are worth retrying.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Malformed record metadata (identity field count, duplicate storage names)
    #[error("Schema error: {0}")]
    Schema(String),

    /// No type handler registered for a semantic type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A predicate references a field missing from the record metadata
    #[error("Unknown field '{field}' on record '{record}'")]
    UnknownField { record: String, field: String },

    /// A comparison between incompatible semantic types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Invalid identifier, literal or payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// A type handler failed to convert a value
    #[error("Conversion error on field '{field}': {message}")]
    Conversion { field: String, message: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The dialect has no rendering for the requested statement
    #[error("Unsupported statement: {0}")]
    Unsupported(String),
}

impl OrmError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create an unknown field error
    pub fn unknown_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conversion error for a specific field
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a schema error
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if this is an unsupported type error
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, Self::UnsupportedType(_))
    }

    /// Check if this is an unknown field error
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }

    /// Check if this is a type mismatch error
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
