use super::*;
use crate::meta::{FieldDef, RecordSchema, resolve_schema};
use crate::predicate::{always, lit, never, null, param, row};
use crate::types::{SemanticType, TypeRegistry};
use std::collections::HashMap;

fn meta() -> TableMeta {
    let schema = RecordSchema::new("DbModel")
        .field(FieldDef::new("ID", SemanticType::Int).id())
        .field(FieldDef::new("Key", SemanticType::Text))
        .field(FieldDef::new("Value", SemanticType::Int))
        .field(FieldDef::new("Active", SemanticType::Bool))
        .field(FieldDef::new("Price", SemanticType::Real))
        .field(FieldDef::new("owner", SemanticType::Ref).column("OwnerId"));
    resolve_schema(&schema, &TypeRegistry::builtin()).unwrap()
}

fn where_clause(p: &Predicate) -> String {
    compile(&meta(), &Dialect::SQL_SERVER, p, None)
        .unwrap()
        .where_clause()
}

fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn constant_true_and_false() {
    assert_eq!(where_clause(&always()), "WHERE 1");
    assert_eq!(where_clause(&never()), "WHERE 0");
}

#[test]
fn null_checks() {
    assert_eq!(where_clause(&row("Key").ne(null())), "WHERE ([Key] IS NOT NULL)");
    assert_eq!(where_clause(&row("Key").eq(null())), "WHERE ([Key] IS NULL)");
}

#[test]
fn null_check_symmetric_form() {
    assert_eq!(where_clause(&null().eq(row("Key"))), "WHERE ([Key] IS NULL)");
    assert_eq!(where_clause(&null().ne(row("Key"))), "WHERE ([Key] IS NOT NULL)");
}

#[test]
fn ordering_against_null_is_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Value").gt(null()), None).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn boolean_equality_renders_as_integer() {
    assert_eq!(where_clause(&row("Active").eq(true)), "WHERE ([Active] = 1)");
    assert_eq!(where_clause(&row("Active").eq(false)), "WHERE ([Active] = 0)");
}

#[test]
fn bare_boolean_field() {
    assert_eq!(where_clause(&row("Active")), "WHERE ([Active] = 1)");
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Value"), None).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn literal_comparisons() {
    assert_eq!(where_clause(&row("Value").gt(2)), "WHERE ([Value] > 2)");
    assert_eq!(where_clause(&row("Value").lte(-7)), "WHERE ([Value] <= -7)");
    assert_eq!(where_clause(&row("Price").gte(2.5)), "WHERE ([Price] >= 2.5)");
    assert_eq!(where_clause(&row("Key").ne("abc")), "WHERE ([Key] != 'abc')");
}

#[test]
fn string_literals_are_escaped() {
    assert_eq!(
        where_clause(&row("Key").eq("O'Brien")),
        "WHERE ([Key] = 'O''Brien')"
    );
}

#[test]
fn literal_on_left_flips_operator() {
    assert_eq!(where_clause(&lit(2).lt(row("Value"))), "WHERE ([Value] > 2)");
}

#[test]
fn storage_name_is_rendered() {
    assert_eq!(where_clause(&row("owner").eq(null())), "WHERE ([OwnerId] IS NULL)");
}

#[test]
fn and_or_are_parenthesized() {
    assert_eq!(
        where_clause(&row("Key").eq(null()).and(row("Value").gt(2))),
        "WHERE (([Key] IS NULL) AND ([Value] > 2))"
    );
    assert_eq!(
        where_clause(&row("Key").eq(null()).or(row("Value").gt(2))),
        "WHERE (([Key] IS NULL) OR ([Value] > 2))"
    );
}

#[test]
fn nested_expressions_keep_every_parenthesis() {
    let p = row("Key")
        .eq(null())
        .or(row("Value").gt(2))
        .and(row("Active").eq(true));
    assert_eq!(
        where_clause(&p),
        "WHERE ((([Key] IS NULL) OR ([Value] > 2)) AND ([Active] = 1))"
    );
}

#[test]
fn deep_nesting_adds_one_pair_per_join() {
    let p = Predicate::all((1..=4).map(|i| row("Value").gt(i)));
    assert_eq!(
        where_clause(&p),
        "WHERE (((([Value] > 1) AND ([Value] > 2)) AND ([Value] > 3)) AND ([Value] > 4))"
    );
}

#[test]
fn constants_inside_logical_nodes() {
    assert_eq!(
        where_clause(&always().and(row("Value").eq(1))),
        "WHERE (1 AND ([Value] = 1))"
    );
}

#[test]
fn unset_param_field_compiles_to_is_null() {
    let p = row("Key").eq(param("Key"));
    let bound = params(&[("Key", Value::Null)]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Key] IS NULL)");
    assert!(fragment.bindings.is_empty());
}

#[test]
fn zero_valued_param_is_treated_as_unset() {
    let p = row("Value").eq(param("Value"));
    let bound = params(&[("Value", Value::Int(0))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Value] IS NULL)");
}

#[test]
fn set_param_field_compiles_to_placeholder() {
    let p = row("Key").eq(param("Key"));
    let bound = params(&[("Key", Value::from("Hello World"))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Key] = @Key)");
    assert_eq!(
        fragment.bindings,
        vec![Binding::new("Key", Value::from("Hello World"))]
    );
}

#[test]
fn unset_param_with_not_equal_is_not_null() {
    let p = row("Key").ne(param("Key"));
    let bound = params(&[("Key", Value::Null)]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Key] IS NOT NULL)");
}

#[test]
fn param_named_after_storage_name_and_serialized() {
    let p = row("Active").eq(param("Active")).and(row("owner").eq(param("owner")));
    let bound = params(&[("Active", Value::Bool(true)), ("owner", Value::Int(9))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.sql, "(([Active] = @Active) AND ([OwnerId] = @OwnerId))");
    assert_eq!(fragment.binding("Active").unwrap().value, Value::Int(1));
    assert_eq!(fragment.binding("OwnerId").unwrap().value, Value::Int(9));
}

#[test]
fn real_against_integer_column_keeps_its_value() {
    assert_eq!(where_clause(&row("Value").gt(2.5)), "WHERE ([Value] > 2.5)");

    let p = row("Value").eq(param("Value"));
    let bound = params(&[("Value", Value::Real(2.5))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Value] = @Value)");
    assert_eq!(fragment.binding("Value").unwrap().value, Value::Real(2.5));

    let nan = params(&[("Value", Value::Real(f64::NAN))]);
    let err = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&nan)).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn unbound_param_is_deferred() {
    let p = row("Key").eq(param("Key"));
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, None).unwrap();
    assert_eq!(fragment.where_clause(), "WHERE ([Key] = @Key)");
    assert!(fragment.bindings.is_empty());
    assert_eq!(
        fragment.deferred,
        vec![DeferredParam {
            placeholder: "Key".into(),
            field: "Key".into()
        }]
    );
}

#[test]
fn repeated_param_reuses_placeholder() {
    let p = row("Value").gt(param("Value")).or(row("Value").eq(param("Value")));
    let bound = params(&[("Value", Value::Int(3))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.sql, "(([Value] > @Value) OR ([Value] = @Value))");
    assert_eq!(fragment.bindings.len(), 1);
}

#[test]
fn colliding_placeholders_are_suffixed() {
    let p = row("Value").gt(param("low")).and(row("Value").lt(param("high")));
    let bound = params(&[("low", Value::Int(1)), ("high", Value::Int(10))]);
    let fragment = compile(&meta(), &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(fragment.sql, "(([Value] > @Value) AND ([Value] < @Value_2))");
    assert_eq!(
        fragment.bindings,
        vec![
            Binding::new("Value", Value::Int(1)),
            Binding::new("Value_2", Value::Int(10)),
        ]
    );
}

#[test]
fn unknown_row_field_is_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Nope").eq(1), None).unwrap_err();
    assert!(err.is_unknown_field());
}

#[test]
fn unknown_param_field_is_rejected() {
    let bound = params(&[]);
    let err = compile(
        &meta(),
        &Dialect::SQL_SERVER,
        &row("Key").eq(param("Key")),
        Some(&bound),
    )
    .unwrap_err();
    assert!(err.is_unknown_field());
}

#[test]
fn incompatible_literal_is_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Value").eq("two"), None).unwrap_err();
    assert!(err.is_type_mismatch());
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Active").eq(1), None).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn incompatible_fields_are_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Key").eq(row("Value")), None).unwrap_err();
    assert!(err.is_type_mismatch());
    let ok = compile(&meta(), &Dialect::SQL_SERVER, &row("Value").lt(row("Price")), None).unwrap();
    assert_eq!(ok.sql, "([Value] < [Price])");
}

#[test]
fn incompatible_param_is_rejected() {
    let bound = params(&[("Value", Value::from("x"))]);
    let err = compile(
        &meta(),
        &Dialect::SQL_SERVER,
        &row("Value").eq(param("Value")),
        Some(&bound),
    )
    .unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn non_boolean_literal_predicate_is_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &lit(3), None).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn non_finite_real_is_rejected() {
    let err = compile(&meta(), &Dialect::SQL_SERVER, &row("Price").gt(f64::NAN), None).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn compilation_is_idempotent() {
    let p = row("Key")
        .eq(param("Key"))
        .or(row("Value").gt(2))
        .and(row("Active").eq(true));
    let bound = params(&[("Key", Value::from("k"))]);
    let m = meta();
    let a = compile(&m, &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    let b = compile(&m, &Dialect::SQL_SERVER, &p, Some(&bound)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn dialect_controls_quoting_and_placeholders() {
    let pg = Dialect::SQLITE
        .with_quote(crate::ident::QuoteStyle::DoubleQuote)
        .with_placeholder_prefix(':');
    let bound = params(&[("Key", Value::from("k"))]);
    let fragment = compile(&meta(), &pg, &row("Key").eq(param("Key")), Some(&bound)).unwrap();
    assert_eq!(fragment.sql, r#"("Key" = :Key)"#);
}
