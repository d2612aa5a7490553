use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use recorm::predicate::{param, row};
use recorm::{
    Dialect, FieldDef, FieldValues, OrmResult, Predicate, Record, RecordSchema, SemanticType,
    TableSql, Value,
};

#[derive(Clone, Default)]
struct Wide {
    id: i64,
    key: Option<String>,
    value: i64,
}

impl FieldValues for Wide {
    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "key" => Some(self.key.clone().into()),
            "value" => Some(self.value.into()),
            _ => None,
        }
    }
}

impl Record for Wide {
    fn schema() -> RecordSchema {
        RecordSchema::new("Wide")
            .field(FieldDef::new("id", SemanticType::Int).id())
            .field(FieldDef::new("key", SemanticType::Text))
            .field(FieldDef::new("value", SemanticType::Int))
    }

    fn set_identity(&mut self, id: i64) -> OrmResult<()> {
        self.id = id;
        Ok(())
    }
}

/// A left-deep tree with `n` comparisons alternating AND / OR:
/// ((value > 0) AND (key = @key)) OR (value > 2) ...
fn build_predicate(n: usize) -> Predicate {
    let mut p = row("value").gt(0);
    for i in 1..n {
        let leaf = if i % 2 == 1 {
            row("key").eq(param("key"))
        } else {
            row("value").gt(i as i64)
        };
        p = if i % 2 == 1 { p.and(leaf) } else { p.or(leaf) };
    }
    p
}

fn bench_where_clause(c: &mut Criterion) {
    let sql = TableSql::for_record::<Wide>(&Dialect::SQL_SERVER).unwrap();
    let example = Wide {
        key: Some("k".into()),
        ..Default::default()
    };
    let mut group = c.benchmark_group("compile/where_clause");

    for n in [1, 5, 10, 50, 100] {
        let p = build_predicate(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &p, |b, p| {
            b.iter(|| black_box(sql.where_clause_with(p, &example).unwrap()));
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let sql = TableSql::for_record::<Wide>(&Dialect::SQLITE).unwrap();
    let candidate = Wide {
        id: 1,
        key: Some("k".into()),
        value: 7,
    };
    let mut group = c.benchmark_group("compile/evaluate");

    for n in [1, 5, 10, 50, 100] {
        let p = build_predicate(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &p, |b, p| {
            b.iter(|| black_box(p.evaluate(sql.meta(), &candidate, Some(&candidate)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_where_clause, bench_evaluate);
criterion_main!(benches);
