//! Dynalock Core - mutual exclusion over a conditional-write key-value store
//!
//! This crate provides:
//! - Lock record model (`LockKey`, `LockRecord`)
//! - `LockStore` trait, the only boundary to the backing store
//! - Error taxonomy separating condition failures, store failures and timeouts
//! - `LockClient` with the acquire poll loop and release logic
//! - `MemoryStore`, an in-memory store for tests and local runs

pub mod constants;
pub mod error;
pub mod lock;
pub mod model;
pub mod store;

pub use error::{BackendErrorKind, LockError, StoreError, StoreOperation};
pub use lock::{AcquireOptions, Acquisition, LockClient, ReleaseOutcome};
pub use model::{Item, LockKey, LockRecord, OWNER_ATTRIBUTE};
pub use store::{LockStore, MemoryStore};
