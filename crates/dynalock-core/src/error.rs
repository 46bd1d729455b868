//! Error types for store calls and lock operations
//!
//! Every store failure is classified as either `StoreError::ConditionFailed`
//! (the lock is already held) or `StoreError::Backend` (anything else).
//! `LockError` is what callers of `LockClient` see; a condition failure is
//! absorbed by the acquire loop and never surfaces there.

use std::fmt;
use std::time::Duration;

/// Store call that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    ConditionalInsert,
    ConsistentGet,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOperation::ConditionalInsert => "conditional insert",
            StoreOperation::ConsistentGet => "consistent get",
            StoreOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Coarse cause of a backend failure, for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Throttled,
    AccessDenied,
    ResourceNotFound,
    InvalidRequest,
    Transport,
    Unavailable,
    Other,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendErrorKind::Throttled => "throttled",
            BackendErrorKind::AccessDenied => "access denied",
            BackendErrorKind::ResourceNotFound => "resource not found",
            BackendErrorKind::InvalidRequest => "invalid request",
            BackendErrorKind::Transport => "transport",
            BackendErrorKind::Unavailable => "unavailable",
            BackendErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Error returned by a `LockStore` operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The conditional insert's precondition was not met: a record already exists
    #[error("conditional check failed: record already exists")]
    ConditionFailed,

    #[error("{operation} failed ({kind}): {message}")]
    Backend {
        operation: StoreOperation,
        kind: BackendErrorKind,
        message: String,
    },
}

impl StoreError {
    pub fn backend(
        operation: StoreOperation,
        kind: BackendErrorKind,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Backend {
            operation,
            kind,
            message: message.into(),
        }
    }

    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StoreError::ConditionFailed)
    }
}

/// Terminal outcome of an acquire or release
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("failed to create lock '{name}': {source}")]
    Acquire {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to get lock '{name}' during unlock process: {source}")]
    Read {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete lock '{name}': {source}")]
    Delete {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("timed out after {elapsed:?} waiting to acquire lock '{name}' ({attempts} attempts)")]
    Timeout {
        name: String,
        elapsed: Duration,
        attempts: u32,
    },

    #[error("lock '{name}' is held by {}, not '{expected}'", describe_holder(.actual))]
    NotOwner {
        name: String,
        expected: String,
        actual: Option<String>,
    },
}

fn describe_holder(actual: &Option<String>) -> String {
    match actual {
        Some(owner) => format!("'{owner}'"),
        None => "an unknown owner".to_string(),
    }
}

impl LockError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }

    /// The underlying store error, if this failure came from the store
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            LockError::Acquire { source, .. }
            | LockError::Read { source, .. }
            | LockError::Delete { source, .. } => Some(source),
            LockError::Timeout { .. } | LockError::NotOwner { .. } => None,
        }
    }

    /// Name of the lock the failure refers to
    pub fn lock_name(&self) -> &str {
        match self {
            LockError::Acquire { name, .. }
            | LockError::Read { name, .. }
            | LockError::Delete { name, .. }
            | LockError::Timeout { name, .. }
            | LockError::NotOwner { name, .. } => name,
        }
    }
}
