//! Predicate AST and its builder API.
//!
//! A [`Predicate`] is a small boolean expression over one record (the "row") and
//! optionally a second, externally supplied value (the "param"). Trees are built
//! with the free functions and combinators below, compiled once, and dropped.
//!
//! ```ignore
//! use recorm::predicate::{null, param, row};
//!
//! // (row.Key == null || row.Value > 2) && row.Active == true
//! let p = row("Key").eq(null()).or(row("Value").gt(2)).and(row("Active").eq(true));
//!
//! // (row, p) => row.Key == p.Key
//! let q = row("Key").eq(param("Key"));
//! ```

mod eval;

use crate::error::OrmResult;
use crate::record::Record;
use crate::value::Value;
use std::fmt;

/// A constant operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Real(r) => Value::Real(*r),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v.into())
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Real(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(v: Option<T>) -> Self {
        v.map_or(Literal::Null, Into::into)
    }
}

/// Which value a field access reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The record being filtered.
    Row,
    /// The externally supplied parameter value.
    Param,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Gte => ">=",
            CmpOp::Lte => "<=",
        }
    }

    /// The operator with its operands swapped: `a < b` is `b > a`.
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Neq => CmpOp::Neq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Gte => CmpOp::Lte,
            CmpOp::Lte => CmpOp::Gte,
        }
    }

    /// Equality-style operators are the only ones meaningful against NULL.
    pub fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Neq)
    }
}

/// Boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
        }
    }
}

/// Predicate AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Literal(Literal),
    Field {
        name: String,
        slot: Slot,
    },
    Compare {
        op: CmpOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Logical {
        op: LogicOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
}

/// Access `field` on the record being filtered.
pub fn row(field: impl Into<String>) -> Predicate {
    Predicate::Field {
        name: field.into(),
        slot: Slot::Row,
    }
}

/// Access `field` on the parameter value.
pub fn param(field: impl Into<String>) -> Predicate {
    Predicate::Field {
        name: field.into(),
        slot: Slot::Param,
    }
}

/// A literal operand.
pub fn lit(value: impl Into<Literal>) -> Predicate {
    Predicate::Literal(value.into())
}

/// The `null` literal.
pub fn null() -> Predicate {
    Predicate::Literal(Literal::Null)
}

/// Matches every row.
pub fn always() -> Predicate {
    Predicate::Literal(Literal::Bool(true))
}

/// Matches no row.
pub fn never() -> Predicate {
    Predicate::Literal(Literal::Bool(false))
}

macro_rules! impl_literal_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Predicate {
                fn from(value: $ty) -> Self {
                    Predicate::Literal(value.into())
                }
            }
        )*
    };
}

impl_literal_operand!(Literal, bool, i32, i64, f64, &str, String);

impl<T: Into<Literal>> From<Option<T>> for Predicate {
    fn from(value: Option<T>) -> Self {
        Predicate::Literal(value.into())
    }
}

impl Predicate {
    fn compare(self, op: CmpOp, other: impl Into<Predicate>) -> Self {
        Predicate::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Neq, other)
    }

    pub fn gt(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Gt, other)
    }

    pub fn lt(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Lt, other)
    }

    pub fn gte(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Gte, other)
    }

    pub fn lte(self, other: impl Into<Predicate>) -> Self {
        self.compare(CmpOp::Lte, other)
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::Logical {
            op: LogicOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Logical {
            op: LogicOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Left-fold `preds` with AND; [`always`] when empty.
    pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
        preds.into_iter().reduce(Predicate::and).unwrap_or_else(always)
    }

    /// Left-fold `preds` with OR; [`never`] when empty.
    pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
        preds.into_iter().reduce(Predicate::or).unwrap_or_else(never)
    }

    /// `row.f == param.f` for every non-identity field of `record` holding a
    /// non-default value, AND-ed together; [`always`] when there is none.
    ///
    /// Compile or evaluate the result with `record` itself as the parameter.
    pub fn matching<R: Record>(record: &R) -> OrmResult<Self> {
        let meta = R::meta()?;
        let preds = meta
            .non_identity()
            .filter(|c| {
                record
                    .field_value(c.field())
                    .is_some_and(|v| !v.is_default())
            })
            .map(|c| row(c.field()).eq(param(c.field())));
        Ok(Predicate::all(preds))
    }

    /// Whether this node is a literal `true` / `false`.
    pub fn as_constant(&self) -> Option<bool> {
        match self {
            Predicate::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Literal(Literal::Null) => f.write_str("null"),
            Predicate::Literal(Literal::Bool(b)) => write!(f, "{b}"),
            Predicate::Literal(Literal::Int(i)) => write!(f, "{i}"),
            Predicate::Literal(Literal::Real(r)) => write!(f, "{r}"),
            Predicate::Literal(Literal::Text(s)) => write!(f, "{s:?}"),
            Predicate::Field { name, slot: Slot::Row } => write!(f, "row.{name}"),
            Predicate::Field { name, slot: Slot::Param } => write!(f, "param.{name}"),
            Predicate::Compare { op, left, right } => {
                let op = match op {
                    CmpOp::Eq => "==",
                    other => other.as_sql(),
                };
                write!(f, "({left} {op} {right})")
            }
            Predicate::Logical { op, left, right } => {
                let op = match op {
                    LogicOp::And => "&&",
                    LogicOp::Or => "||",
                };
                write!(f, "({left} {op} {right})")
            }
        }
    }
}
