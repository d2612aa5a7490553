//! In-process predicate evaluation.
//!
//! Mirrors what the compiled SQL does on a server: values are compared in their
//! stored form, NULL makes a comparison unknown, and unknown rows do not match.

use super::{CmpOp, Literal, LogicOp, Predicate, Slot};
use crate::compile::{Operand, check_family, check_values};
use crate::error::{OrmError, OrmResult};
use crate::meta::{Column, TableMeta};
use crate::record::FieldValues;
use crate::types::TypeFamily;
use crate::value::Value;
use std::cmp::Ordering;

impl Predicate {
    /// Whether `row` satisfies this predicate, using SQL three-valued logic.
    ///
    /// Applies the same type checks and null rules as the SQL compiler, so a
    /// predicate that fails to compile fails to evaluate too. Unlike compilation,
    /// every `param.*` access needs a bound `param`.
    pub fn evaluate(
        &self,
        meta: &TableMeta,
        row: &dyn FieldValues,
        param: Option<&dyn FieldValues>,
    ) -> OrmResult<bool> {
        let evaluator = Evaluator { meta, row, param };
        Ok(evaluator.truth(self)? == Some(true))
    }
}

struct Evaluator<'a> {
    meta: &'a TableMeta,
    row: &'a dyn FieldValues,
    param: Option<&'a dyn FieldValues>,
}

impl<'a> Evaluator<'a> {
    /// `None` is SQL's UNKNOWN.
    fn truth(&self, node: &Predicate) -> OrmResult<Option<bool>> {
        match node {
            Predicate::Literal(Literal::Bool(b)) => Ok(Some(*b)),
            Predicate::Literal(other) => Err(OrmError::type_mismatch(format!(
                "literal {} is not a boolean predicate",
                Predicate::Literal(other.clone())
            ))),
            Predicate::Field {
                name,
                slot: Slot::Row,
            } => {
                let column = self.meta.column(name)?;
                if column.family() != TypeFamily::Boolean {
                    return Err(OrmError::type_mismatch(format!(
                        "field '{name}' is {} and cannot be used as a predicate",
                        column.family()
                    )));
                }
                let stored = self.row_value(column)?;
                as_truth(name, &column.deserialize(&stored)?)
            }
            Predicate::Field {
                name,
                slot: Slot::Param,
            } => as_truth(name, &self.param_value(name)?),
            Predicate::Compare { op, left, right } => self.compare(*op, left, right),
            Predicate::Logical { op, left, right } => {
                // Both sides are checked so type errors surface regardless of data.
                let l = self.truth(left)?;
                let r = self.truth(right)?;
                Ok(match op {
                    LogicOp::And => match (l, r) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    },
                    LogicOp::Or => match (l, r) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    },
                })
            }
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

    fn compare(&self, op: CmpOp, left: &Predicate, right: &Predicate) -> OrmResult<Option<bool>> {
        let mut op = op;
        let mut lhs = self.operand(left)?;
        let mut rhs = self.operand(right)?;
        if rhs.rank() < lhs.rank() {
            std::mem::swap(&mut lhs, &mut rhs);
            op = op.flip();
        }

        if rhs.is_null_literal() {
            return self.null_check(op, &lhs);
        }

        match (&lhs, &rhs) {
            (Operand::Column(a), Operand::Column(b)) if a.family() != b.family() => {
                return Err(OrmError::type_mismatch(format!(
                    "cannot compare {} field '{}' with {} field '{}'",
                    a.family(),
                    a.field(),
                    b.family(),
                    b.field()
                )));
            }
            (Operand::Column(column), Operand::Literal(lit)) => {
                check_family(column, &lit.to_value())?;
            }
            (Operand::Column(column), Operand::Param(field)) => {
                let value = self.param_value(field)?;
                check_family(column, &value)?;
                if value.is_default() && op.is_equality() {
                    return self.null_check(op, &lhs);
                }
            }
            (Operand::Param(field), Operand::Literal(lit)) => {
                check_values(&self.param_value(field)?, &lit.to_value())?;
            }
            (Operand::Param(a), Operand::Param(b)) => {
                check_values(&self.param_value(a)?, &self.param_value(b)?)?;
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
        let a = self.value(&lhs, None)?;
        let b = self.value(&rhs, column)?;
        Ok(compare_values(op, &a, &b))
    }

    fn null_check(&self, op: CmpOp, operand: &Operand<'_>) -> OrmResult<Option<bool>> {
        let is_null = self.value(operand, None)?.is_null();
        match op {
            CmpOp::Eq => Ok(Some(is_null)),
            CmpOp::Neq => Ok(Some(!is_null)),
            other => Err(OrmError::type_mismatch(format!(
                "operator {} cannot compare against null",
                other.as_sql()
            ))),
        }
    }

    /// The operand in stored form; params and literals go through `counterpart`'s
    /// handler like their bindings would.
    fn value(&self, operand: &Operand<'_>, counterpart: Option<&Column>) -> OrmResult<Value> {
        let logical = match operand {
            Operand::Column(column) => return self.row_value(column),
            Operand::Param(field) => self.param_value(field)?,
            Operand::Literal(lit) => lit.to_value(),
        };
        match counterpart {
            Some(column) => column.serialize_operand(&logical),
            None => Ok(logical),
        }
    }

    fn row_value(&self, column: &Column) -> OrmResult<Value> {
        let value = self
            .row
            .field_value(column.field())
            .ok_or_else(|| OrmError::unknown_field(self.meta.record(), column.field()))?;
        column.serialize(&value)
    }

    fn param_value(&self, field: &str) -> OrmResult<Value> {
        let Some(param) = self.param else {
            return Err(OrmError::validation(format!(
                "predicate reads param.{field} but no parameter was supplied"
            )));
        };
        param
            .field_value(field)
            .ok_or_else(|| OrmError::unknown_field("parameter", field))
    }
}

fn as_truth(name: &str, value: &Value) -> OrmResult<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(OrmError::type_mismatch(format!(
            "field '{name}' holds a {} value and cannot be used as a predicate",
            other.kind()
        ))),
    }
}

fn compare_values(op: CmpOp, a: &Value, b: &Value) -> Option<bool> {
    let ordering = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return None,
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Real(y)) => (*x as f64).partial_cmp(y)?,
        (Value::Real(x), Value::Int(y)) => x.partial_cmp(&(*y as f64))?,
        (Value::Real(x), Value::Real(y)) => x.partial_cmp(y)?,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Uuid(x), Value::Uuid(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Json(x), Value::Json(y)) => {
            return match op {
                CmpOp::Eq => Some(x == y),
                CmpOp::Neq => Some(x != y),
                _ => None,
            };
        }
        _ => return None,
    };
    Some(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Neq => ordering != Ordering::Equal,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Gte => ordering != Ordering::Less,
        CmpOp::Lte => ordering != Ordering::Greater,
    })
}

#[cfg(test)]
mod tests {
    use crate::meta::{FieldDef, RecordSchema, TableMeta, resolve_schema};
    use crate::predicate::{always, null, param, row};
    use crate::types::{SemanticType, TypeRegistry};
    use crate::value::Value;
    use std::collections::HashMap;

    fn meta() -> TableMeta {
        let schema = RecordSchema::new("DbModel")
            .field(FieldDef::new("ID", SemanticType::Int).id())
            .field(FieldDef::new("Key", SemanticType::Text))
            .field(FieldDef::new("Value", SemanticType::Int))
            .field(FieldDef::new("Active", SemanticType::Bool))
            .field(FieldDef::new("Parent", SemanticType::Ref));
        resolve_schema(&schema, &TypeRegistry::builtin()).unwrap()
    }

    fn record(key: Option<&str>, value: Option<i64>, active: bool) -> HashMap<String, Value> {
        HashMap::from([
            ("ID".to_string(), Value::Int(1)),
            ("Key".to_string(), Value::from(key)),
            ("Value".to_string(), Value::from(value)),
            ("Active".to_string(), Value::Bool(active)),
            ("Parent".to_string(), Value::Int(0)),
        ])
    }

    #[test]
    fn nested_predicate() {
        let m = meta();
        let p = row("Key")
            .eq(null())
            .or(row("Value").gt(2))
            .and(row("Active").eq(true));
        assert!(p.evaluate(&m, &record(None, Some(0), true), None).unwrap());
        assert!(p.evaluate(&m, &record(Some("k"), Some(3), true), None).unwrap());
        assert!(!p.evaluate(&m, &record(Some("k"), Some(1), true), None).unwrap());
        assert!(!p.evaluate(&m, &record(None, Some(9), false), None).unwrap());
    }

    #[test]
    fn null_comparisons_are_unknown() {
        let m = meta();
        let r = record(Some("k"), None, true);
        assert!(!row("Value").gt(2).evaluate(&m, &r, None).unwrap());
        assert!(!row("Value").lte(2).evaluate(&m, &r, None).unwrap());
        assert!(row("Value").gt(2).or(always()).evaluate(&m, &r, None).unwrap());
        assert!(row("Value").eq(null()).evaluate(&m, &r, None).unwrap());
    }

    #[test]
    fn zero_reference_reads_as_null() {
        let m = meta();
        let r = record(None, None, false);
        assert!(row("Parent").eq(null()).evaluate(&m, &r, None).unwrap());
    }

    #[test]
    fn bare_boolean_field() {
        let m = meta();
        assert!(row("Active").evaluate(&m, &record(None, None, true), None).unwrap());
        assert!(!row("Active").evaluate(&m, &record(None, None, false), None).unwrap());
    }

    #[test]
    fn param_equality_follows_unset_rule() {
        let m = meta();
        let p = row("Key").eq(param("Key"));
        let unset = HashMap::from([("Key".to_string(), Value::Null)]);
        let set = HashMap::from([("Key".to_string(), Value::from("k"))]);

        assert!(p.evaluate(&m, &record(None, None, true), Some(&unset)).unwrap());
        assert!(!p.evaluate(&m, &record(Some("k"), None, true), Some(&unset)).unwrap());
        assert!(p.evaluate(&m, &record(Some("k"), None, true), Some(&set)).unwrap());
        assert!(!p.evaluate(&m, &record(Some("x"), None, true), Some(&set)).unwrap());
    }

    #[test]
    fn flipped_operands() {
        let m = meta();
        let r = record(None, Some(5), true);
        assert!(crate::predicate::lit(2).lt(row("Value")).evaluate(&m, &r, None).unwrap());
    }

    #[test]
    fn real_operand_against_integer_column() {
        let m = meta();
        let r = record(None, Some(3), true);
        assert!(row("Value").gt(2.5).evaluate(&m, &r, None).unwrap());
        assert!(!row("Value").lt(2.5).evaluate(&m, &r, None).unwrap());

        let three = HashMap::from([("Value".to_string(), Value::Real(3.0))]);
        assert!(row("Value").eq(param("Value")).evaluate(&m, &r, Some(&three)).unwrap());
    }

    #[test]
    fn missing_param_is_an_error() {
        let err = row("Key")
            .eq(param("Key"))
            .evaluate(&meta(), &record(None, None, true), None)
            .unwrap_err();
        assert!(matches!(err, crate::OrmError::Validation(_)));
    }

    #[test]
    fn type_errors_match_the_compiler() {
        let m = meta();
        let r = record(None, None, true);
        assert!(row("Value").eq("x").evaluate(&m, &r, None).unwrap_err().is_type_mismatch());
        assert!(row("Nope").eq(1).evaluate(&m, &r, None).unwrap_err().is_unknown_field());
        assert!(row("Value").gt(null()).evaluate(&m, &r, None).unwrap_err().is_type_mismatch());
    }
}
