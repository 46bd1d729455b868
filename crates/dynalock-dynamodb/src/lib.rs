//! Dynalock DynamoDB - `LockStore` backed by Amazon DynamoDB
//!
//! This crate provides:
//! - `DynamoDbStore`: conditional `PutItem`, consistent `GetItem`, `DeleteItem`
//! - Classification of SDK errors into the `StoreError` taxonomy

mod classify;
mod item;
mod store;

pub use classify::kind_from_code;
pub use item::{from_attribute_map, to_attribute_map};
pub use store::{DynamoDbConfig, DynamoDbStore, condition_expression};
