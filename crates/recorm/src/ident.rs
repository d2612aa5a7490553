//! Safe SQL identifier handling.
//!
//! [`Ident`] is a single-part table or column name. Names double as `@name`
//! placeholders, so they are restricted to `[A-Za-z_][A-Za-z0-9_]*` and quoting is
//! decided by the dialect at render time.
//!
//! # Example
//! ```ignore
//! use recorm::{Ident, QuoteStyle};
//!
//! let col = Ident::parse("Key")?;
//! assert_eq!(col.quoted(QuoteStyle::Bracket), "[Key]");
//! # Ok::<(), recorm::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};
use std::fmt;

/// How a dialect delimits identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `[name]`, with `]` escaped as `]]`.
    Bracket,
    /// `"name"`, with `"` escaped as `""`.
    DoubleQuote,
}

impl QuoteStyle {
    /// Append `name` to `out` wrapped in this style's delimiters.
    pub fn write(self, name: &str, out: &mut String) {
        let (open, close) = match self {
            QuoteStyle::Bracket => ('[', ']'),
            QuoteStyle::DoubleQuote => ('"', '"'),
        };
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }
}

/// A validated SQL identifier (table or column name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Parse and validate an identifier.
    pub fn parse(s: &str) -> OrmResult<Self> {
        let mut chars = s.chars();
        let Some(first) = chars.next() else {
            return Err(OrmError::validation("Identifier cannot be empty"));
        };
        if !(first == '_' || first.is_ascii_alphabetic()) {
            return Err(OrmError::validation(format!(
                "Invalid identifier start character '{first}' in '{s}'"
            )));
        }
        if let Some(c) = chars.find(|c| !(*c == '_' || c.is_ascii_alphanumeric())) {
            return Err(OrmError::validation(format!(
                "Invalid character '{c}' in identifier '{s}'"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The bare identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the identifier quoted in the given style.
    pub fn quoted(&self, style: QuoteStyle) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        style.write(&self.0, &mut out);
        out
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
