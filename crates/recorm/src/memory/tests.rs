use super::*;
use crate::meta::{FieldDef, RecordSchema};
use crate::predicate::{null, param, row};
use crate::types::SemanticType;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

#[derive(Debug, Clone, Default, PartialEq)]
struct Item {
    id: i64,
    key: Option<String>,
    value: i64,
    active: bool,
}

impl Item {
    fn new(key: Option<&str>, value: i64, active: bool) -> Self {
        Self {
            id: 0,
            key: key.map(str::to_string),
            value,
            active,
        }
    }
}

impl FieldValues for Item {
    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "ID" => Some(self.id.into()),
            "Key" => Some(self.key.clone().into()),
            "Value" => Some(self.value.into()),
            "Active" => Some(self.active.into()),
            _ => None,
        }
    }
}

impl Record for Item {
    fn schema() -> RecordSchema {
        RecordSchema::new("Item")
            .field(FieldDef::new("ID", SemanticType::Int).id())
            .field(FieldDef::new("Key", SemanticType::Text))
            .field(FieldDef::new("Value", SemanticType::Int))
            .field(FieldDef::new("Active", SemanticType::Bool))
    }

    fn set_identity(&mut self, id: i64) -> OrmResult<()> {
        self.id = id;
        Ok(())
    }
}

fn table() -> MemoryTable<Item> {
    let table = MemoryTable::with_config(MemoryConfig::new().with_bucket_size(2)).unwrap();
    assert!(table.create_table());
    table
        .write([
            Item::new(None, 1, true),
            Item::new(Some("a"), 3, true),
            Item::new(Some("b"), 5, false),
            Item::new(Some("c"), 0, true),
        ])
        .unwrap();
    table
}

fn ids(rows: &[Item]) -> Vec<i64> {
    rows.iter().map(|r| r.id).collect()
}

#[test]
fn table_must_exist() {
    let table = MemoryTable::<Item>::new().unwrap();
    assert!(table.read_all().unwrap_err().is_not_found());
    assert!(table.create_table());
    assert!(!table.create_table());
    assert!(table.drop_table());
    assert!(table.write([Item::default()]).unwrap_err().is_not_found());
}

#[test]
fn write_assigns_sequential_ids_across_buckets() {
    let table = table();
    let rows = table.read_all().unwrap();
    assert_eq!(ids(&rows), [1, 2, 3, 4]);
    assert_eq!(table.len(), 4);
    assert_eq!(table.read(3).unwrap().unwrap().key.as_deref(), Some("b"));
    assert_eq!(table.read(99).unwrap(), None);
}

#[test]
fn read_where_uses_sql_semantics() {
    let table = table();
    let p = row("Key")
        .eq(null())
        .or(row("Value").gt(2))
        .and(row("Active").eq(true));
    assert_eq!(ids(&table.read_where(&p).unwrap()), [1, 2]);
    assert_eq!(ids(&table.read_where(&row("Key").ne(null())).unwrap()), [2, 3, 4]);
}

#[test]
fn read_where_with_param() {
    let table = table();
    let p = row("Key").eq(param("Key"));
    let by_key = HashMap::from([("Key".to_string(), Value::from("b"))]);
    assert_eq!(ids(&table.read_where_with(&p, &by_key).unwrap()), [3]);

    let unset = HashMap::from([("Key".to_string(), Value::Null)]);
    assert_eq!(ids(&table.read_where_with(&p, &unset).unwrap()), [1]);
}

#[test]
fn read_matching_ignores_default_fields() {
    let table = table();
    let example = Item::new(None, 0, true);
    assert_eq!(ids(&table.read_matching(&example).unwrap()), [1, 2, 4]);
    assert_eq!(table.read_matching(&Item::default()).unwrap().len(), 4);
}

#[test]
fn ill_typed_predicates_fail_even_when_empty() {
    let table = MemoryTable::<Item>::new().unwrap();
    table.create_table();
    assert!(table.read_where(&row("Value").eq("x")).unwrap_err().is_type_mismatch());
    assert!(matches!(
        table.read_where(&row("Key").eq(param("Key"))).unwrap_err(),
        OrmError::Validation(_)
    ));
}

#[test]
fn real_bounds_on_integer_fields() {
    let table = table();
    assert_eq!(ids(&table.read_where(&row("Value").gt(2.5)).unwrap()), [2, 3]);

    let p = row("Value").lte(param("Value"));
    let bound = HashMap::from([("Value".to_string(), Value::Real(1.5))]);
    assert_eq!(ids(&table.read_where_with(&p, &bound).unwrap()), [1, 4]);
}

#[test]
fn update_replaces_existing_rows() {
    let table = table();
    let mut item = table.read(2).unwrap().unwrap();
    item.value = 42;
    assert_eq!(table.update([item.clone()]).unwrap(), 1);
    assert_eq!(table.read(2).unwrap(), Some(item));

    let ghost = Item {
        id: 77,
        ..Default::default()
    };
    assert!(table.update([ghost]).unwrap_err().is_not_found());
    assert!(table.update([Item::default()]).unwrap_err().is_not_found());
}

#[test]
fn delete_by_id_is_all_or_nothing() {
    let table = table();
    assert!(table.delete(&[1, 50]).unwrap_err().is_not_found());
    assert_eq!(table.len(), 4);
    assert_eq!(table.delete(&[1, 4]).unwrap(), 2);
    assert_eq!(ids(&table.read_all().unwrap()), [2, 3]);
}

#[test]
fn overlapping_deletes_never_remove_part_of_a_batch() {
    let table = Arc::new(MemoryTable::<Item>::new().unwrap());
    table.create_table();
    table
        .write((0..100).map(|v| Item::new(Some("r"), v, true)))
        .unwrap();

    let batches: [Vec<i64>; 2] = [(1..=50).collect(), (50..=100).collect()];
    let handles: Vec<_> = batches
        .iter()
        .cloned()
        .map(|ids| {
            let table = Arc::clone(&table);
            std::thread::spawn(move || table.delete(&ids))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let deleted: Vec<usize> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(deleted.len(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(OrmError::is_not_found));
    assert_eq!(table.len(), 100 - deleted[0]);
}

#[test]
fn delete_where_counts_removed_rows() {
    let table = table();
    assert_eq!(table.delete_where(&row("Active")).unwrap(), 3);
    assert_eq!(ids(&table.read_all().unwrap()), [3]);

    let p = row("Value").lt(param("Value"));
    let limit = HashMap::from([("Value".to_string(), Value::Int(10))]);
    assert_eq!(table.delete_where_with(&p, &limit).unwrap(), 1);
    assert!(table.is_empty());
}

#[test]
fn drop_table_clears_rows() {
    let table = table();
    assert!(table.drop_table());
    assert!(table.create_table());
    assert!(table.is_empty());
}

#[derive(Default)]
struct Log(Mutex<Vec<String>>);

impl TableObserver<Item> for Log {
    fn on_created(&self, record: &Item) {
        self.0.lock().unwrap().push(format!("created {}", record.id));
    }

    fn on_updated(&self, before: &Item, after: &Item) {
        self.0
            .lock()
            .unwrap()
            .push(format!("updated {} {}->{}", after.id, before.value, after.value));
    }

    fn on_deleted(&self, id: i64) {
        self.0.lock().unwrap().push(format!("deleted {id}"));
    }
}

#[test]
fn observers_see_every_change() {
    let table = MemoryTable::<Item>::new().unwrap();
    table.create_table();
    let log = Arc::new(Log::default());
    table.subscribe(log.clone());

    let mut written = table.write([Item::new(Some("x"), 1, true)]).unwrap();
    written[0].value = 2;
    table.update(written.clone()).unwrap();
    table.delete(&[written[0].id]).unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        ["created 1", "updated 1 1->2", "deleted 1"]
    );
}

#[derive(Debug, Clone, Default)]
struct Priced {
    id: i64,
    price: f64,
}

impl FieldValues for Priced {
    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "ID" => Some(self.id.into()),
            "Price" => Some(self.price.into()),
            _ => None,
        }
    }
}

impl Record for Priced {
    fn schema() -> RecordSchema {
        RecordSchema::new("Priced")
            .field(FieldDef::new("ID", SemanticType::Int).id())
            .field(FieldDef::new("Price", SemanticType::Real))
    }

    fn set_identity(&mut self, id: i64) -> OrmResult<()> {
        self.id = id;
        Ok(())
    }
}

#[derive(Default)]
struct Counter(AtomicUsize);

impl TableObserver<Priced> for Counter {
    fn on_created(&self, _record: &Priced) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn on_updated(&self, _before: &Priced, _after: &Priced) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn invalid_write_batch_stores_nothing() {
    let table = MemoryTable::<Priced>::new().unwrap();
    table.create_table();
    let seen = Arc::new(Counter::default());
    table.subscribe(seen.clone());

    let batch = [
        Priced { id: 0, price: 1.0 },
        Priced { id: 0, price: f64::NAN },
    ];
    assert!(matches!(
        table.write(batch).unwrap_err(),
        OrmError::Conversion { .. }
    ));
    assert!(table.is_empty());
    assert_eq!(seen.0.load(Ordering::SeqCst), 0);

    let written = table.write([Priced { id: 0, price: 2.0 }]).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(seen.0.load(Ordering::SeqCst), 1);

    let good = Priced {
        id: written[0].id,
        price: 3.0,
    };
    let bad = Priced {
        id: written[0].id,
        price: f64::INFINITY,
    };
    assert!(table.update([good.clone(), bad]).is_err());
    let ghost = Priced { id: 999, price: 4.0 };
    assert!(table.update([good, ghost]).unwrap_err().is_not_found());
    assert_eq!(table.read(written[0].id).unwrap().unwrap().price, 2.0);
    assert_eq!(seen.0.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_writers_get_distinct_ids() {
    let table = Arc::new(MemoryTable::<Item>::new().unwrap());
    table.create_table();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                for v in 0..50 {
                    table.write([Item::new(Some("t"), t * 100 + v, true)]).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let rows = table.read_all().unwrap();
    assert_eq!(rows.len(), 200);
    assert_eq!(ids(&rows), (1..=200).collect::<Vec<_>>());
}
