//! Store abstraction the lock protocol depends on
//!
//! Atomicity of `conditional_insert` is delegated entirely to the backend;
//! the client holds no in-process mutex.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Item, LockKey};

/// Backend holding lock records
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Insert `item` under `key` if and only if no record with that key exists.
    ///
    /// Must return `StoreError::ConditionFailed` when a record is already present.
    async fn conditional_insert(&self, key: &LockKey, item: Item) -> Result<(), StoreError>;

    /// Strongly-consistent point read of the record stored under `key`
    async fn consistent_get(&self, key: &LockKey) -> Result<Option<Item>, StoreError>;

    /// Unconditionally remove the record stored under `key`
    async fn delete(&self, key: &LockKey) -> Result<(), StoreError>;
}
