//! `lock` and `unlock` subcommands

use std::sync::Arc;

use dynalock_core::{Acquisition, LockClient, LockError, LockStore, ReleaseOutcome};
use tracing::info;

use crate::cli::Command;
use crate::configuration::{Configuration, ConfigurationError};

/// Failure of a subcommand
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Run `command` against `store`
pub async fn run(
    command: &Command,
    configuration: &Configuration,
    store: Arc<dyn LockStore>,
) -> Result<(), CommandError> {
    let client = LockClient::new(store);
    match command {
        Command::Lock(_) => lock(configuration, &client).await.map(|_| ()),
        Command::Unlock(_) => unlock(configuration, &client).await.map(|_| ()),
    }
}

/// Acquire the configured lock
pub async fn lock(
    configuration: &Configuration,
    client: &LockClient,
) -> Result<Acquisition, CommandError> {
    let key = configuration.lock_key()?;
    let options = configuration.acquire_options()?;

    info!(
        timeout_minutes = configuration.timeout_minutes()?,
        table = %key.table,
        key_name = %key.key_attribute,
        lock_name = %key.name,
        identifier = options.owner.as_deref().unwrap_or_default(),
        "Creating lock with the following parameters"
    );

    Ok(client.acquire(&key, &options).await?)
}

/// Release the configured lock
pub async fn unlock(
    configuration: &Configuration,
    client: &LockClient,
) -> Result<ReleaseOutcome, CommandError> {
    let key = configuration.lock_key()?;

    info!(
        table = %key.table,
        key_name = %key.key_attribute,
        lock_name = %key.name,
        "Releasing lock with the following parameters"
    );

    let outcome = match configuration.identifier()? {
        Some(owner) if configuration.verify_owner()? => client.release_owned(&key, &owner).await?,
        _ => client.release(&key).await?,
    };
    Ok(outcome)
}
