//! Lock acquire and release over a `LockStore`

use std::sync::Arc;

use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use super::model::{AcquireOptions, Acquisition, ReleaseOutcome};
use crate::error::{LockError, StoreError};
use crate::model::{LockKey, LockRecord};
use crate::store::LockStore;

/// Deadline used when `started + timeout` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Client running the lock protocol against a store handle
#[derive(Clone)]
pub struct LockClient {
    store: Arc<dyn LockStore>,
}

impl LockClient {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Create the lock record exclusively, polling until it is created or
    /// `options.timeout` elapses.
    ///
    /// A held lock is retried every `options.retry_interval`; any other store
    /// failure aborts on the spot. Waiters are not ordered: every one of them
    /// races the same conditional insert.
    pub async fn acquire(
        &self,
        key: &LockKey,
        options: &AcquireOptions,
    ) -> Result<Acquisition, LockError> {
        let started = Instant::now();
        let deadline = started
            .checked_add(options.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let record = LockRecord::new(key.clone(), options.owner.clone());
        let mut attempts: u32 = 0;

        info!(lock = %key, timeout = ?options.timeout, "Acquiring lock");

        loop {
            attempts += 1;
            match self.store.conditional_insert(key, record.to_item()).await {
                Ok(()) => {
                    let waited = started.elapsed();
                    info!(lock = %key, attempts, waited = ?waited, "Lock acquired");
                    return Ok(Acquisition {
                        record,
                        attempts,
                        waited,
                    });
                }
                Err(StoreError::ConditionFailed) => {
                    debug!(lock = %key, attempts, "Lock is held by another owner");
                }
                Err(source) => {
                    return Err(LockError::Acquire {
                        name: key.name.clone(),
                        source,
                    });
                }
            }

            let delay = options.retry_delay();
            tokio::select! {
                biased;
                _ = sleep_until(deadline) => {
                    let elapsed = started.elapsed();
                    warn!(lock = %key, attempts, elapsed = ?elapsed, "Timed out waiting to acquire lock");
                    return Err(LockError::Timeout {
                        name: key.name.clone(),
                        elapsed,
                        attempts,
                    });
                }
                _ = sleep(delay) => {
                    info!(lock = %key, attempts, "Failed to acquire lock, trying again");
                }
            }
        }
    }

    /// Delete the lock record if present. Releasing a free lock is a no-op.
    ///
    /// The recorded owner is not checked: any caller can release any lock.
    /// Use [`LockClient::release_owned`] to refuse releasing someone else's.
    pub async fn release(&self, key: &LockKey) -> Result<ReleaseOutcome, LockError> {
        self.release_checked(key, None).await
    }

    /// Delete the lock record only if it was recorded with `owner`
    pub async fn release_owned(
        &self,
        key: &LockKey,
        owner: &str,
    ) -> Result<ReleaseOutcome, LockError> {
        self.release_checked(key, Some(owner)).await
    }

    async fn release_checked(
        &self,
        key: &LockKey,
        expected_owner: Option<&str>,
    ) -> Result<ReleaseOutcome, LockError> {
        debug!(lock = %key, "Reading lock before release");
        let item = self
            .store
            .consistent_get(key)
            .await
            .map_err(|source| LockError::Read {
                name: key.name.clone(),
                source,
            })?;

        let item = match item {
            Some(item) if !item.is_empty() => item,
            _ => {
                info!(lock = %key, "Lock is not held, nothing to release");
                return Ok(ReleaseOutcome::NotHeld);
            }
        };

        if let Some(expected) = expected_owner {
            let record = LockRecord::from_item(key.clone(), &item);
            if record.owner.as_deref() != Some(expected) {
                return Err(LockError::NotOwner {
                    name: key.name.clone(),
                    expected: expected.to_string(),
                    actual: record.owner,
                });
            }
        }

        info!(lock = %key, "Releasing lock");
        self.store
            .delete(key)
            .await
            .map_err(|source| LockError::Delete {
                name: key.name.clone(),
                source,
            })?;

        Ok(ReleaseOutcome::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendErrorKind, StoreOperation};
    use crate::model::Item;
    use crate::store::MemoryStore;

    fn key() -> LockKey {
        LockKey::new("locks", "LockID", "my-lock")
    }

    fn held_by(owner: &str) -> Item {
        let mut item = Item::new();
        item.insert("LockID".to_string(), "my-lock".to_string());
        item.insert("owner".to_string(), owner.to_string());
        item
    }

    fn setup() -> (Arc<MemoryStore>, LockClient) {
        let store = Arc::new(MemoryStore::new());
        let client = LockClient::new(store.clone());
        (store, client)
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_free_lock_first_attempt() {
        let (store, client) = setup();

        let acquisition = client
            .acquire(&key(), &AcquireOptions::default().with_owner("run-1"))
            .await
            .unwrap();

        assert_eq!(acquisition.attempts, 1);
        assert_eq!(acquisition.waited, Duration::ZERO);
        assert_eq!(acquisition.record.owner.as_deref(), Some("run-1"));
        assert_eq!(store.get(&key()), Some(held_by("run-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_retries_until_released() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));

        let releaser = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(12)).await;
                store.remove(&key());
            })
        };

        let acquisition = client
            .acquire(&key(), &AcquireOptions::default())
            .await
            .unwrap();
        releaser.await.unwrap();

        // attempts at 0s, 5s, 10s fail; 15s wins
        assert_eq!(acquisition.attempts, 4);
        assert_eq!(acquisition.waited, Duration::from_secs(15));
        assert_eq!(store.insert_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));

        let options = AcquireOptions::default().with_timeout(Duration::from_secs(60));
        let err = client.acquire(&key(), &options).await.unwrap_err();

        match err {
            LockError::Timeout {
                name,
                elapsed,
                attempts,
            } => {
                assert_eq!(name, "my-lock");
                assert_eq!(elapsed, Duration::from_secs(60));
                assert_eq!(attempts, 12);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(store.insert_calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_waits_for_release() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));

        let releaser = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3590)).await;
                store.remove(&key());
            })
        };

        let options = AcquireOptions::default()
            .with_timeout(Duration::MAX)
            .with_retry_interval(Duration::from_secs(60));
        let acquisition = client.acquire(&key(), &options).await.unwrap();
        releaser.await.unwrap();

        // attempts every minute from 0s; the first one after the release is at 3600s
        assert_eq!(acquisition.attempts, 61);
        assert_eq!(acquisition.waited, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_makes_a_single_attempt() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));

        let options = AcquireOptions::default().with_timeout(Duration::ZERO);
        let err = client.acquire(&key(), &options).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_aborts_on_store_error() {
        let (store, client) = setup();
        store.fail_inserts_with(Some(StoreError::backend(
            StoreOperation::ConditionalInsert,
            BackendErrorKind::AccessDenied,
            "not authorized",
        )));

        let err = client
            .acquire(&key(), &AcquireOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LockError::Acquire { .. }));
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_release_held_lock() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));

        let outcome = client.release(&key()).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released);
        assert!(!store.contains(&key()));
        assert_eq!(store.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_release_free_lock_is_noop() {
        let (store, client) = setup();

        let outcome = client.release(&key()).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::NotHeld);
        assert_eq!(store.get_calls(), 1);
        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_release_read_failure() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));
        store.fail_gets_with(Some(StoreError::backend(
            StoreOperation::ConsistentGet,
            BackendErrorKind::Transport,
            "connection reset",
        )));

        let err = client.release(&key()).await.unwrap_err();

        assert!(matches!(err, LockError::Read { .. }));
        assert_eq!(store.delete_calls(), 0);
        assert!(store.contains(&key()));
    }

    #[tokio::test]
    async fn test_release_delete_failure() {
        let (store, client) = setup();
        store.put(key(), held_by("other"));
        store.fail_deletes_with(Some(StoreError::backend(
            StoreOperation::Delete,
            BackendErrorKind::Unavailable,
            "service unavailable",
        )));

        let err = client.release(&key()).await.unwrap_err();

        assert!(matches!(err, LockError::Delete { .. }));
        assert!(store.contains(&key()));
    }

    #[tokio::test]
    async fn test_release_ignores_owner() {
        let (store, client) = setup();
        store.put(key(), held_by("someone-else"));

        assert_eq!(
            client.release(&key()).await.unwrap(),
            ReleaseOutcome::Released
        );
    }

    #[tokio::test]
    async fn test_release_owned() {
        let (store, client) = setup();
        store.put(key(), held_by("run-1"));

        let err = client.release_owned(&key(), "run-2").await.unwrap_err();
        match err {
            LockError::NotOwner {
                expected, actual, ..
            } => {
                assert_eq!(expected, "run-2");
                assert_eq!(actual.as_deref(), Some("run-1"));
            }
            other => panic!("expected not-owner, got {other:?}"),
        }
        assert_eq!(store.delete_calls(), 0);

        let outcome = client.release_owned(&key(), "run-1").await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::Released);
        assert!(!store.contains(&key()));

        let outcome = client.release_owned(&key(), "run-1").await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::NotHeld);
    }
}
