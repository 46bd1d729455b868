//! Default values shared by the library and the CLI

use std::time::Duration;

/// Default time, in minutes, to wait for a lock before giving up
pub const DEFAULT_LOCK_TIMEOUT_MINUTES: u64 = 30;

/// Default table the lock record is written to
pub const DEFAULT_LOCK_TABLE: &str = "github-action-locks";

/// Default name of the attribute holding the lock's identity
pub const DEFAULT_LOCK_KEY_NAME: &str = "LockID";

/// Default lock name
pub const DEFAULT_LOCK_NAME: &str = "foobar";

/// Default pause between two conditional-insert attempts, in seconds
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(DEFAULT_LOCK_TIMEOUT_MINUTES * 60);

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS);
