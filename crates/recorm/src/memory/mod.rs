//! In-memory table.
//!
//! [`MemoryTable`] keeps records in id-range buckets, each behind its own lock, and
//! answers the same predicates as the SQL builder by evaluating them in process. It
//! is meant as a stand-in for a real table in tests.

use crate::compile::Compiler;
use crate::config::MemoryConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::meta::TableMeta;
use crate::predicate::Predicate;
use crate::record::{FieldValues, Record};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

/// Receives change notifications from a [`MemoryTable`], after the change is applied.
pub trait TableObserver<R>: Send + Sync {
    fn on_created(&self, _record: &R) {}

    fn on_updated(&self, _before: &R, _after: &R) {}

    fn on_deleted(&self, _id: i64) {}
}

type Bucket<R> = RwLock<BTreeMap<i64, R>>;

type Guards<'b, R> = BTreeMap<i64, RwLockWriteGuard<'b, BTreeMap<i64, R>>>;

enum Change<R> {
    Created(R),
    Updated(R, R),
    Deleted(i64),
}

/// A thread-safe in-memory table of `R`.
pub struct MemoryTable<R> {
    meta: Arc<TableMeta>,
    config: MemoryConfig,
    exists: AtomicBool,
    next_id: AtomicI64,
    buckets: RwLock<BTreeMap<i64, Arc<Bucket<R>>>>,
    observers: RwLock<Vec<Arc<dyn TableObserver<R>>>>,
}

impl<R> fmt::Debug for MemoryTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTable")
            .field("table", &self.meta.table())
            .field("config", &self.config)
            .field("exists", &self.exists.load(Ordering::Acquire))
            .field("next_id", &self.next_id.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<R: Record + Clone> MemoryTable<R> {
    /// A table for `R` with the default configuration. The table must be created
    /// before use.
    pub fn new() -> OrmResult<Self> {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> OrmResult<Self> {
        Ok(Self {
            meta: R::meta()?,
            config: MemoryConfig::new().with_bucket_size(config.bucket_size),
            exists: AtomicBool::new(false),
            next_id: AtomicI64::new(1),
            buckets: RwLock::new(BTreeMap::new()),
            observers: RwLock::new(Vec::new()),
        })
    }

    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn subscribe(&self, observer: Arc<dyn TableObserver<R>>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Returns `false` if the table already existed.
    pub fn create_table(&self) -> bool {
        let created = !self.exists.swap(true, Ordering::AcqRel);
        tracing::debug!(target: "recorm.memory", table = %self.meta.table(), created, "create table");
        created
    }

    /// Drop the table and every row in it. Returns `false` if it did not exist.
    pub fn drop_table(&self) -> bool {
        let existed = self.exists.swap(false, Ordering::AcqRel);
        self.buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!(target: "recorm.memory", table = %self.meta.table(), existed, "drop table");
        existed
    }

    /// Insert `records`, assigning each a fresh identity. Returns the stored records.
    ///
    /// The whole batch is validated before any row is stored; on error the table is
    /// unchanged, though identities handed out to the batch are not reused.
    pub fn write(&self, records: impl IntoIterator<Item = R>) -> OrmResult<Vec<R>> {
        self.ensure_exists()?;
        let records: Vec<R> = records.into_iter().collect();
        for record in &records {
            self.check_fields(record)?;
        }
        let mut staged = Vec::with_capacity(records.len());
        for mut record in records {
            let id = self.next_id.fetch_add(1, Ordering::AcqRel);
            record.set_identity(id)?;
            staged.push((id, record));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (id, record) in staged {
            self.bucket_or_insert(id)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, record.clone());
            written.push(record);
        }
        tracing::debug!(
            target: "recorm.memory",
            table = %self.meta.table(),
            count = written.len(),
            "wrote records"
        );
        self.notify(written.iter().cloned().map(Change::Created).collect());
        Ok(written)
    }

    /// Every row, in id order.
    pub fn read_all(&self) -> OrmResult<Vec<R>> {
        self.ensure_exists()?;
        let mut rows = Vec::new();
        for bucket in self.snapshot() {
            let bucket = bucket.read().unwrap_or_else(PoisonError::into_inner);
            rows.extend(bucket.values().cloned());
        }
        Ok(rows)
    }

    pub fn read(&self, id: i64) -> OrmResult<Option<R>> {
        self.ensure_exists()?;
        Ok(self.bucket(id).and_then(|bucket| {
            bucket
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&id)
                .cloned()
        }))
    }

    pub fn read_where(&self, predicate: &Predicate) -> OrmResult<Vec<R>> {
        self.check_predicate(predicate, None)?;
        self.filter(predicate, None)
    }

    pub fn read_where_with(&self, predicate: &Predicate, param: &dyn FieldValues) -> OrmResult<Vec<R>> {
        self.check_predicate(predicate, Some(param))?;
        self.filter(predicate, Some(param))
    }

    /// Rows equal to `example` on each of its non-default, non-identity fields.
    pub fn read_matching(&self, example: &R) -> OrmResult<Vec<R>> {
        let predicate = Predicate::matching(example)?;
        self.read_where_with(&predicate, example)
    }

    /// Replace stored rows by identity. Every record must already exist; if one is
    /// invalid or missing nothing is replaced.
    pub fn update(&self, records: impl IntoIterator<Item = R>) -> OrmResult<usize> {
        self.ensure_exists()?;
        let mut staged = Vec::new();
        for record in records {
            self.check_fields(&record)?;
            staged.push((self.identity_of(&record)?, record));
        }

        let buckets = self.buckets_for(staged.iter().map(|(id, _)| *id))?;
        let mut guards = Self::lock_all(&buckets);
        self.ensure_present(&guards, staged.iter().map(|(id, _)| *id))?;
        let mut changes = Vec::with_capacity(staged.len());
        for (id, record) in staged {
            let slot = guards
                .get_mut(&self.bucket_key(id))
                .and_then(|rows| rows.get_mut(&id));
            if let Some(slot) = slot {
                let before = std::mem::replace(slot, record.clone());
                changes.push(Change::Updated(before, record));
            }
        }
        drop(guards);

        let count = changes.len();
        tracing::debug!(target: "recorm.memory", table = %self.meta.table(), count, "updated records");
        self.notify(changes);
        Ok(count)
    }

    /// Delete rows by identity. Fails without deleting anything if any id is missing.
    pub fn delete(&self, ids: &[i64]) -> OrmResult<usize> {
        self.ensure_exists()?;
        let buckets = self.buckets_for(ids.iter().copied())?;
        let mut guards = Self::lock_all(&buckets);
        self.ensure_present(&guards, ids.iter().copied())?;
        let mut changes = Vec::new();
        for &id in ids {
            let removed = guards
                .get_mut(&self.bucket_key(id))
                .and_then(|rows| rows.remove(&id));
            if removed.is_some() {
                changes.push(Change::Deleted(id));
            }
        }
        drop(guards);

        let count = changes.len();
        tracing::debug!(target: "recorm.memory", table = %self.meta.table(), count, "deleted records");
        self.notify(changes);
        Ok(count)
    }

    pub fn delete_where(&self, predicate: &Predicate) -> OrmResult<usize> {
        self.check_predicate(predicate, None)?;
        self.remove_matching(predicate, None)
    }

    pub fn delete_where_with(&self, predicate: &Predicate, param: &dyn FieldValues) -> OrmResult<usize> {
        self.check_predicate(predicate, Some(param))?;
        self.remove_matching(predicate, Some(param))
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|b| b.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_exists(&self) -> OrmResult<()> {
        if self.exists.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(OrmError::not_found(format!(
                "table {} does not exist",
                self.meta.table()
            )))
        }
    }

    fn missing(&self, id: i64) -> OrmError {
        OrmError::not_found(format!("{} with id {id}", self.meta.record()))
    }

    fn bucket_key(&self, id: i64) -> i64 {
        id.div_euclid(self.config.bucket_size as i64)
    }

    fn bucket(&self, id: i64) -> Option<Arc<Bucket<R>>> {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.bucket_key(id))
            .cloned()
    }

    fn bucket_or_insert(&self, id: i64) -> Arc<Bucket<R>> {
        if let Some(bucket) = self.bucket(id) {
            return bucket;
        }
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(buckets.entry(self.bucket_key(id)).or_default())
    }

    /// Buckets holding `ids`, by bucket key. An id whose bucket was never created
    /// is missing.
    fn buckets_for(&self, ids: impl IntoIterator<Item = i64>) -> OrmResult<BTreeMap<i64, Arc<Bucket<R>>>> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        let mut found = BTreeMap::new();
        for id in ids {
            let key = self.bucket_key(id);
            let bucket = buckets.get(&key).ok_or_else(|| self.missing(id))?;
            found.entry(key).or_insert_with(|| Arc::clone(bucket));
        }
        Ok(found)
    }

    /// Write-lock every bucket in key order, so overlapping batches cannot deadlock.
    fn lock_all(buckets: &BTreeMap<i64, Arc<Bucket<R>>>) -> Guards<'_, R> {
        buckets
            .iter()
            .map(|(key, bucket)| (*key, bucket.write().unwrap_or_else(PoisonError::into_inner)))
            .collect()
    }

    fn ensure_present(&self, guards: &Guards<'_, R>, mut ids: impl Iterator<Item = i64>) -> OrmResult<()> {
        let absent = ids.find(|id| {
            !guards
                .get(&self.bucket_key(*id))
                .is_some_and(|rows| rows.contains_key(id))
        });
        match absent {
            Some(id) => Err(self.missing(id)),
            None => Ok(()),
        }
    }

    fn snapshot(&self) -> Vec<Arc<Bucket<R>>> {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn identity_of(&self, record: &R) -> OrmResult<i64> {
        let identity = self.meta.identity();
        match record.field_value(identity.field()) {
            Some(Value::Int(id)) if id > 0 => Ok(id),
            Some(other) => Err(OrmError::not_found(format!(
                "{} without a stored identity ({} = {other:?})",
                self.meta.record(),
                identity.field()
            ))),
            None => Err(OrmError::unknown_field(self.meta.record(), identity.field())),
        }
    }

    /// Every non-identity field must be present and storable.
    fn check_fields(&self, record: &R) -> OrmResult<()> {
        for column in self.meta.non_identity() {
            let value = record
                .field_value(column.field())
                .ok_or_else(|| OrmError::unknown_field(self.meta.record(), column.field()))?;
            column.serialize(&value)?;
        }
        Ok(())
    }

    /// Reject ill-typed predicates up front, independently of table contents.
    fn check_predicate(&self, predicate: &Predicate, param: Option<&dyn FieldValues>) -> OrmResult<()> {
        self.ensure_exists()?;
        let mut compiler = Compiler::new(&self.meta, &Dialect::SQLITE);
        if let Some(param) = param {
            compiler = compiler.with_param(param);
        }
        let fragment = compiler.compile(predicate)?;
        match fragment.deferred.first() {
            Some(unbound) => Err(OrmError::validation(format!(
                "predicate reads param.{} but no parameter was supplied",
                unbound.field
            ))),
            None => Ok(()),
        }
    }

    fn filter(&self, predicate: &Predicate, param: Option<&dyn FieldValues>) -> OrmResult<Vec<R>> {
        let mut rows = Vec::new();
        for bucket in self.snapshot() {
            let bucket = bucket.read().unwrap_or_else(PoisonError::into_inner);
            for row in bucket.values() {
                if predicate.evaluate(&self.meta, row, param)? {
                    rows.push(row.clone());
                }
            }
        }
        Ok(rows)
    }

    fn remove_matching(&self, predicate: &Predicate, param: Option<&dyn FieldValues>) -> OrmResult<usize> {
        let mut changes = Vec::new();
        for bucket in self.snapshot() {
            let mut rows = bucket.write().unwrap_or_else(PoisonError::into_inner);
            let mut doomed = Vec::new();
            for (id, row) in rows.iter() {
                if predicate.evaluate(&self.meta, row, param)? {
                    doomed.push(*id);
                }
            }
            for id in doomed {
                rows.remove(&id);
                changes.push(Change::Deleted(id));
            }
        }
        let count = changes.len();
        tracing::debug!(target: "recorm.memory", table = %self.meta.table(), count, "deleted matching records");
        self.notify(changes);
        Ok(count)
    }

    fn notify(&self, changes: Vec<Change<R>>) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if observers.is_empty() {
            return;
        }
        for change in &changes {
            for observer in &observers {
                match change {
                    Change::Created(record) => observer.on_created(record),
                    Change::Updated(before, after) => observer.on_updated(before, after),
                    Change::Deleted(id) => observer.on_deleted(*id),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
