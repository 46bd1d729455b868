//! Lock record data model
//!
//! The existence of a record under a given name *is* the lock: present means
//! held, absent means free. There is no expiry.

use std::collections::HashMap;
use std::fmt;

/// Attribute holding the opaque owner tag of the acquiring party
pub const OWNER_ATTRIBUTE: &str = "owner";

/// Attribute map exchanged with a store
pub type Item = HashMap<String, String>;

/// Identifies one lock: the table it lives in, the partition key attribute
/// and the value stored at that attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    /// Target table
    pub table: String,
    /// Name of the attribute holding the lock's identity
    pub key_attribute: String,
    /// Logical lock name, the value stored at `key_attribute`
    pub name: String,
}

impl LockKey {
    pub fn new(
        table: impl Into<String>,
        key_attribute: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            key_attribute: key_attribute.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}={}]", self.table, self.key_attribute, self.name)
    }
}

/// A lock record as written by a successful acquire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub key: LockKey,
    /// Owner tag recorded with the lock, if any
    pub owner: Option<String>,
}

impl LockRecord {
    /// Create a record. An empty owner is treated as "no owner recorded".
    pub fn new(key: LockKey, owner: Option<String>) -> Self {
        Self {
            key,
            owner: owner.filter(|o| !o.is_empty()),
        }
    }

    /// Attribute map written by the conditional insert
    pub fn to_item(&self) -> Item {
        let mut item = Item::with_capacity(2);
        item.insert(self.key.key_attribute.clone(), self.key.name.clone());
        if let Some(owner) = &self.owner {
            item.insert(OWNER_ATTRIBUTE.to_string(), owner.clone());
        }
        item
    }

    /// Rebuild a record from a point-read result
    pub fn from_item(key: LockKey, item: &Item) -> Self {
        let owner = item.get(OWNER_ATTRIBUTE).cloned();
        Self::new(key, owner)
    }
}
