//! Predicate-to-SQL compiler.
//!
//! Translates a [`Predicate`] over a record into a SQL boolean expression plus the
//! named parameter bindings it references. Translation is structural: every node
//! renders the same way wherever it sits in the tree, and every comparison and
//! every logical join is wrapped in exactly one pair of parentheses.
//!
//! | Predicate | SQL |
//! |---|---|
//! | `true` / `false` | `1` / `0` |
//! | `row.k == null` / `row.k != null` | `([k] IS NULL)` / `([k] IS NOT NULL)` |
//! | `row.active == true` | `([active] = 1)` |
//! | `row.v > 2` | `([v] > 2)` |
//! | `row.k == param.k` | `([k] = @k)`, or `([k] IS NULL)` when the bound `param.k` is unset |
//! | `a && b` / `a \|\| b` | `(<a> AND <b>)` / `(<a> OR <b>)` |

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::meta::{Column, TableMeta};
use crate::predicate::{CmpOp, Literal, Predicate, Slot};
use crate::record::FieldValues;
use crate::types::TypeFamily;
use crate::value::Value;

/// A named value referenced by a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Placeholder name, without the dialect prefix.
    pub name: String,
    /// Value in its wire form.
    pub value: Value,
}

impl Binding {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A placeholder whose value comes from a parameter field that was not bound at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredParam {
    pub placeholder: String,
    /// Field of the parameter value to bind.
    pub field: String,
}

/// A compiled SQL boolean expression and the parameters it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFragment {
    pub sql: String,
    pub bindings: Vec<Binding>,
    pub deferred: Vec<DeferredParam>,
}

impl CompiledFragment {
    /// The fragment as a WHERE clause, without statement terminator.
    pub fn where_clause(&self) -> String {
        format!("WHERE {}", self.sql)
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

/// Compile `predicate` against `meta` for `dialect`.
///
/// `param`, when given, resolves `param.*` accesses at compile time; otherwise they
/// become deferred placeholders.
pub fn compile(
    meta: &TableMeta,
    dialect: &Dialect,
    predicate: &Predicate,
    param: Option<&dyn FieldValues>,
) -> OrmResult<CompiledFragment> {
    let mut compiler = Compiler::new(meta, dialect);
    if let Some(param) = param {
        compiler = compiler.with_param(param);
    }
    compiler.compile(predicate)
}

/// Reusable compiler over one table and dialect.
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    meta: &'a TableMeta,
    dialect: &'a Dialect,
    param: Option<&'a dyn FieldValues>,
}

/// An operand of a comparison, after field lookup.
pub(crate) enum Operand<'a> {
    Column(&'a Column),
    Param(&'a str),
    Literal(&'a Literal),
}

impl Operand<'_> {
    pub(crate) fn is_null_literal(&self) -> bool {
        matches!(self, Operand::Literal(Literal::Null))
    }

    // Rank used to order operands: columns first, then params, then literals,
    // with NULL last so the null rules only need to look at the right side.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Operand::Column(_) => 0,
            Operand::Param(_) => 1,
            Operand::Literal(Literal::Null) => 3,
            Operand::Literal(_) => 2,
        }
    }
}

#[derive(Default)]
struct Output {
    sql: String,
    bindings: Vec<Binding>,
    deferred: Vec<DeferredParam>,
    // (placeholder, param field) pairs handed out so far
    placeholders: Vec<(String, String)>,
}

impl Output {
    /// Placeholder for `field` named after `base`, suffixed when `base` is already
    /// taken by a different param field. Returns `(name, newly_allocated)`.
    fn placeholder(&mut self, base: &str, field: &str) -> (String, bool) {
        let mut n = 1usize;
        loop {
            let name = if n == 1 {
                base.to_string()
            } else {
                format!("{base}_{n}")
            };
            match self.placeholders.iter().find(|(p, _)| *p == name) {
                Some((_, f)) if f == field => return (name, false),
                Some(_) => n += 1,
                None => {
                    self.placeholders.push((name.clone(), field.to_string()));
                    return (name, true);
                }
            }
        }
    }
}

impl<'a> Compiler<'a> {
    pub fn new(meta: &'a TableMeta, dialect: &'a Dialect) -> Self {
        Self {
            meta,
            dialect,
            param: None,
        }
    }

    /// Resolve `param.*` accesses against `param` at compile time.
    pub fn with_param(mut self, param: &'a dyn FieldValues) -> Self {
        self.param = Some(param);
        self
    }

    pub fn compile(&self, predicate: &Predicate) -> OrmResult<CompiledFragment> {
        let mut out = Output::default();
        self.write_predicate(predicate, &mut out)?;
        tracing::trace!(
            target: "recorm.sql",
            record = self.meta.record(),
            predicate = %predicate,
            sql = %out.sql,
            binding_count = out.bindings.len(),
            "compiled predicate"
        );
        Ok(CompiledFragment {
            sql: out.sql,
            bindings: out.bindings,
            deferred: out.deferred,
        })
    }

    fn write_predicate(&self, node: &Predicate, out: &mut Output) -> OrmResult<()> {
        match node {
            Predicate::Literal(Literal::Bool(b)) => {
                out.sql.push(if *b { '1' } else { '0' });
                Ok(())
            }
            Predicate::Literal(other) => Err(OrmError::type_mismatch(format!(
                "literal {} is not a boolean predicate",
                Predicate::Literal(other.clone())
            ))),
            Predicate::Field { name, slot } => self.write_bare_field(name, *slot, out),
            Predicate::Compare { op, left, right } => self.write_compare(*op, left, right, out),
            Predicate::Logical { op, left, right } => {
                out.sql.push('(');
                self.write_predicate(left, out)?;
                out.sql.push(' ');
                out.sql.push_str(op.as_sql());
                out.sql.push(' ');
                self.write_predicate(right, out)?;
                out.sql.push(')');
                Ok(())
            }
        }
    }

    /// A boolean field used directly as a predicate, i.e. `field == true`.
    fn write_bare_field(&self, name: &str, slot: Slot, out: &mut Output) -> OrmResult<()> {
        match slot {
            Slot::Row => {
                let column = self.meta.column(name)?;
                if column.family() != TypeFamily::Boolean {
                    return Err(OrmError::type_mismatch(format!(
                        "field '{name}' is {} and cannot be used as a predicate",
                        column.family()
                    )));
                }
                out.sql.push('(');
                self.dialect.write_ident(column.name(), &mut out.sql);
                out.sql.push_str(" = 1)");
                Ok(())
            }
            Slot::Param => match self.param_value(name)? {
                Some(Value::Bool(b)) => {
                    out.sql.push(if b { '1' } else { '0' });
                    Ok(())
                }
                Some(other) => Err(OrmError::type_mismatch(format!(
                    "param field '{name}' is {} and cannot be used as a predicate",
                    other.kind()
                ))),
                None => {
                    out.sql.push('(');
                    self.write_param(name, name, None, out)?;
                    out.sql.push_str(" = 1)");
                    Ok(())
                }
            },
        }
    }

    fn operand<'p>(&self, node: &'p Predicate) -> OrmResult<Operand<'p>>
    where
        'a: 'p,
    {
        match node {
            Predicate::Literal(lit) => Ok(Operand::Literal(lit)),
            Predicate::Field {
                name,
                slot: Slot::Row,
            } => Ok(Operand::Column(self.meta.column(name)?)),
            Predicate::Field {
                name,
                slot: Slot::Param,
            } => Ok(Operand::Param(name)),
            other => Err(OrmError::type_mismatch(format!(
                "comparison operands must be fields or literals, got {other}"
            ))),
        }
    }

    fn write_compare(
        &self,
        op: CmpOp,
        left: &Predicate,
        right: &Predicate,
        out: &mut Output,
    ) -> OrmResult<()> {
        let mut op = op;
        let mut lhs = self.operand(left)?;
        let mut rhs = self.operand(right)?;
        if rhs.rank() < lhs.rank() {
            std::mem::swap(&mut lhs, &mut rhs);
            op = op.flip();
        }

        if rhs.is_null_literal() {
            return self.write_null_check(op, &lhs, out);
        }

        match (&lhs, &rhs) {
            (Operand::Column(a), Operand::Column(b)) => {
                if a.family() != b.family() {
                    return Err(OrmError::type_mismatch(format!(
                        "cannot compare {} field '{}' with {} field '{}'",
                        a.family(),
                        a.field(),
                        b.family(),
                        b.field()
                    )));
                }
            }
            (Operand::Column(column), Operand::Literal(lit)) => {
                check_family(column, &lit.to_value())?;
            }
            (Operand::Column(column), Operand::Param(field)) => {
                if let Some(value) = self.param_value(field)? {
                    check_family(column, &value)?;
                    if value.is_default() && op.is_equality() {
                        return self.write_null_check(op, &lhs, out);
                    }
                }
            }
            (Operand::Param(field), Operand::Literal(lit)) => {
                if let Some(value) = self.param_value(field)? {
                    check_values(&value, &lit.to_value())?;
                }
            }
            (Operand::Param(a), Operand::Param(b)) => {
                if let (Some(va), Some(vb)) = (self.param_value(a)?, self.param_value(b)?) {
                    check_values(&va, &vb)?;
                }
            }
            (Operand::Literal(a), Operand::Literal(b)) => {
                check_values(&a.to_value(), &b.to_value())?;
            }
            _ => {}
        }

        let column = match &lhs {
            Operand::Column(c) => Some(*c),
            _ => None,
        };
        out.sql.push('(');
        self.write_operand(&lhs, None, out)?;
        out.sql.push(' ');
        out.sql.push_str(op.as_sql());
        out.sql.push(' ');
        self.write_operand(&rhs, column, out)?;
        out.sql.push(')');
        Ok(())
    }

    fn write_null_check(&self, op: CmpOp, operand: &Operand<'_>, out: &mut Output) -> OrmResult<()> {
        let test = match op {
            CmpOp::Eq => "IS NULL",
            CmpOp::Neq => "IS NOT NULL",
            other => {
                return Err(OrmError::type_mismatch(format!(
                    "operator {} cannot compare against null",
                    other.as_sql()
                )));
            }
        };
        out.sql.push('(');
        self.write_operand(operand, None, out)?;
        out.sql.push(' ');
        out.sql.push_str(test);
        out.sql.push(')');
        Ok(())
    }

    /// `counterpart` is the column on the other side of the comparison; params are
    /// named after it and serialized through its handler.
    fn write_operand(
        &self,
        operand: &Operand<'_>,
        counterpart: Option<&Column>,
        out: &mut Output,
    ) -> OrmResult<()> {
        match operand {
            Operand::Column(column) => {
                self.dialect.write_ident(column.name(), &mut out.sql);
                Ok(())
            }
            Operand::Literal(lit) => self.write_literal(lit, &mut out.sql),
            Operand::Param(field) => {
                let base = counterpart.map_or(*field, |c| c.name().as_str());
                self.write_param(base, field, counterpart, out)
            }
        }
    }

    fn write_param(
        &self,
        base: &str,
        field: &str,
        column: Option<&Column>,
        out: &mut Output,
    ) -> OrmResult<()> {
        // Param field names become placeholder names when no column names them.
        Ident::parse(base)?;
        let (name, fresh) = out.placeholder(base, field);
        if fresh {
            match self.param_value(field)? {
                Some(value) => {
                    let value = match column {
                        Some(column) => column.serialize_operand(&value)?,
                        None => value,
                    };
                    out.bindings.push(Binding::new(name.clone(), value));
                }
                None => out.deferred.push(DeferredParam {
                    placeholder: name.clone(),
                    field: field.to_string(),
                }),
            }
        }
        self.dialect.write_placeholder(&name, &mut out.sql);
        Ok(())
    }

    fn write_literal(&self, lit: &Literal, out: &mut String) -> OrmResult<()> {
        match lit {
            Literal::Null => out.push_str("NULL"),
            Literal::Bool(b) => out.push(if *b { '1' } else { '0' }),
            Literal::Int(i) => out.push_str(&i.to_string()),
            Literal::Real(r) => {
                if !r.is_finite() {
                    return Err(OrmError::validation(format!(
                        "real literal {r} has no SQL rendering"
                    )));
                }
                out.push_str(&r.to_string());
            }
            Literal::Text(s) => self.dialect.write_text_literal(s, out),
        }
        Ok(())
    }

    /// The bound parameter's value for `field`; `None` when no parameter is bound.
    fn param_value(&self, field: &str) -> OrmResult<Option<Value>> {
        let Some(param) = self.param else {
            return Ok(None);
        };
        param
            .field_value(field)
            .map(Some)
            .ok_or_else(|| OrmError::unknown_field("parameter", field))
    }
}

pub(crate) fn check_family(column: &Column, value: &Value) -> OrmResult<()> {
    if column.family().accepts(value) {
        Ok(())
    } else {
        Err(OrmError::type_mismatch(format!(
            "cannot compare {} field '{}' with a {} value",
            column.family(),
            column.field(),
            value.kind()
        )))
    }
}

pub(crate) fn check_values(a: &Value, b: &Value) -> OrmResult<()> {
    let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Real(_));
    let compatible = a.is_null()
        || b.is_null()
        || std::mem::discriminant(a) == std::mem::discriminant(b)
        || (numeric(a) && numeric(b));
    if compatible {
        Ok(())
    } else {
        Err(OrmError::type_mismatch(format!(
            "cannot compare a {} value with a {} value",
            a.kind(),
            b.kind()
        )))
    }
}

#[cfg(test)]
mod tests;
