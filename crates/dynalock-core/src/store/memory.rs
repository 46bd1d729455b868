//! In-memory lock store
//!
//! Records live in a `DashMap` keyed by (table, key attribute, name); the
//! entry API gives the same insert-if-absent atomicity a real backend does.
//! Call counters and fault injection make it usable as a test double.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use super::LockStore;
use crate::error::StoreError;
use crate::model::{Item, LockKey};

#[derive(Default)]
struct CallCounters {
    inserts: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
}

#[derive(Default)]
struct Faults {
    insert: Mutex<Option<StoreError>>,
    get: Mutex<Option<StoreError>>,
    delete: Mutex<Option<StoreError>>,
}

/// In-memory `LockStore`
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<LockKey, Item>,
    calls: CallCounters,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record directly, bypassing the conditional insert and the counters
    pub fn put(&self, key: LockKey, item: Item) {
        self.records.insert(key, item);
    }

    /// Remove a record directly, bypassing the counters
    pub fn remove(&self, key: &LockKey) -> Option<Item> {
        self.records.remove(key).map(|(_, item)| item)
    }

    pub fn contains(&self, key: &LockKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &LockKey) -> Option<Item> {
        self.records.get(key).map(|item| item.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert_calls(&self) -> u64 {
        self.calls.inserts.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u64 {
        self.calls.gets.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u64 {
        self.calls.deletes.load(Ordering::SeqCst)
    }

    /// Make every following conditional insert fail with `err` (`None` clears)
    pub fn fail_inserts_with(&self, err: Option<StoreError>) {
        *self.faults.insert.lock() = err;
    }

    /// Make every following consistent get fail with `err` (`None` clears)
    pub fn fail_gets_with(&self, err: Option<StoreError>) {
        *self.faults.get.lock() = err;
    }

    /// Make every following delete fail with `err` (`None` clears)
    pub fn fail_deletes_with(&self, err: Option<StoreError>) {
        *self.faults.delete.lock() = err;
    }

    fn injected(fault: &Mutex<Option<StoreError>>) -> Result<(), StoreError> {
        match fault.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn conditional_insert(&self, key: &LockKey, item: Item) -> Result<(), StoreError> {
        self.calls.inserts.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.faults.insert)?;

        match self.records.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::ConditionFailed),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    async fn consistent_get(&self, key: &LockKey) -> Result<Option<Item>, StoreError> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.faults.get)?;

        Ok(self.get(key))
    }

    async fn delete(&self, key: &LockKey) -> Result<(), StoreError> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.faults.delete)?;

        self.records.remove(key);
        Ok(())
    }
}
