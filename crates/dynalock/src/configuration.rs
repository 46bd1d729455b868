//! Configuration management for dynalock
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! configuration file, `INPUT_*` environment variables (GitHub Action inputs)
//! and command line flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use dynalock_core::AcquireOptions;
use dynalock_core::LockKey;
use dynalock_core::constants::{
    DEFAULT_LOCK_KEY_NAME, DEFAULT_LOCK_NAME, DEFAULT_LOCK_TABLE, DEFAULT_LOCK_TIMEOUT_MINUTES,
    DEFAULT_RETRY_INTERVAL_SECS,
};
use dynalock_dynamodb::DynamoDbConfig;
use tracing::Level;

use crate::cli::{Cli, Command};
use crate::logging::LoggingConfig;

/// Prefix of environment variables bound to configuration keys
pub const ENV_PREFIX: &str = "INPUT";

/// How long to wait to acquire a lock, in minutes
pub const LOCK_TIMEOUT_VAR: &str = "timeout";
/// DynamoDB table to write the lock in
pub const LOCK_TABLE_VAR: &str = "table";
/// Name of the column where locks are written
pub const LOCK_KEY_NAME_VAR: &str = "key";
/// Name of the lock
pub const LOCK_NAME_VAR: &str = "name";
/// Owner identifier recorded with the lock
pub const LOCK_IDENTIFIER_VAR: &str = "identifier";
/// Seconds between acquisition attempts
pub const LOCK_INTERVAL_VAR: &str = "interval";
/// Random spread of the retry interval
pub const LOCK_JITTER_VAR: &str = "jitter";
/// Refuse to release locks recorded with another identifier
pub const VERIFY_OWNER_VAR: &str = "verify_owner";
pub const REGION_VAR: &str = "region";
pub const ENDPOINT_VAR: &str = "endpoint";
pub const STORE_TIMEOUT_MS_VAR: &str = "store_timeout_ms";
pub const LOG_LEVEL_VAR: &str = "log_level";
pub const LOG_DIR_VAR: &str = "log_dir";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Source(#[from] ConfigError),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Application configuration loaded from file, environment and flags
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration for `cli` using the process environment
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::load_with_env(cli, None)
    }

    /// Load configuration for `cli`, reading `INPUT_*` variables from `env`
    /// instead of the process environment when given
    pub fn load_with_env(cli: &Cli, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = &cli.config_file {
            builder = builder.add_source(File::from(path.as_path()));
        }

        // Values stay strings; typed getters convert on read
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).source(env));

        builder = Self::apply_flags(builder, cli)?;

        let configuration = Configuration {
            config: builder.build()?,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    fn apply_flags(
        builder: ConfigBuilder<DefaultState>,
        cli: &Cli,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        let target = cli.command.target();
        let mut builder = builder
            .set_override_option(LOG_LEVEL_VAR, cli.log_level.clone())?
            .set_override_option(LOCK_TABLE_VAR, target.table.clone())?
            .set_override_option(LOCK_KEY_NAME_VAR, target.key.clone())?
            .set_override_option(LOCK_NAME_VAR, target.name.clone())?
            .set_override_option(REGION_VAR, target.region.clone())?
            .set_override_option(ENDPOINT_VAR, target.endpoint.clone())?;

        match &cli.command {
            Command::Lock(args) => {
                builder = builder
                    .set_override_option(LOCK_TIMEOUT_VAR, args.timeout)?
                    .set_override_option(LOCK_IDENTIFIER_VAR, args.identifier.clone())?
                    .set_override_option(LOCK_INTERVAL_VAR, args.interval)?
                    .set_override_option(LOCK_JITTER_VAR, args.jitter)?;
            }
            Command::Unlock(args) => {
                builder = builder
                    .set_override_option(LOCK_IDENTIFIER_VAR, args.identifier.clone())?
                    .set_override_option(VERIFY_OWNER_VAR, args.verify_owner.then_some(true))?;
            }
        }

        Ok(builder)
    }

    fn validate(&self) -> Result<()> {
        self.timeout()?;
        self.retry_interval()?;
        self.jitter()?;
        self.store_timeout_ms()?;

        if self.verify_owner()? && self.identifier()?.is_none() {
            return Err(ConfigurationError::Invalid {
                key: VERIFY_OWNER_VAR,
                reason: "an identifier is required to verify the lock owner".to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Raw accessors
    // ========================================================================

    fn string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.string_opt(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn string_opt(&self, key: &str) -> Result<Option<String>> {
        match self.config.get_string(key) {
            Ok(v) if v.is_empty() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn non_negative_or(&self, key: &'static str, default: u64) -> Result<u64> {
        match self.config.get_int(key) {
            Ok(v) => u64::try_from(v).map_err(|_| ConfigurationError::Invalid {
                key,
                reason: format!("{} is negative", v),
            }),
            Err(ConfigError::NotFound(_)) => Ok(default),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Lock Configuration
    // ========================================================================

    pub fn timeout_minutes(&self) -> Result<u64> {
        self.non_negative_or(LOCK_TIMEOUT_VAR, DEFAULT_LOCK_TIMEOUT_MINUTES)
    }

    pub fn timeout(&self) -> Result<Duration> {
        let minutes = self.timeout_minutes()?;
        minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigurationError::Invalid {
                key: LOCK_TIMEOUT_VAR,
                reason: format!("{} minutes is too large", minutes),
            })
    }

    pub fn table(&self) -> Result<String> {
        self.string_or(LOCK_TABLE_VAR, DEFAULT_LOCK_TABLE)
    }

    pub fn key_name(&self) -> Result<String> {
        self.string_or(LOCK_KEY_NAME_VAR, DEFAULT_LOCK_KEY_NAME)
    }

    pub fn lock_name(&self) -> Result<String> {
        self.string_or(LOCK_NAME_VAR, DEFAULT_LOCK_NAME)
    }

    /// Owner identifier; empty means none
    pub fn identifier(&self) -> Result<Option<String>> {
        self.string_opt(LOCK_IDENTIFIER_VAR)
    }

    pub fn retry_interval(&self) -> Result<Duration> {
        let secs = self.non_negative_or(LOCK_INTERVAL_VAR, DEFAULT_RETRY_INTERVAL_SECS)?;
        if secs == 0 {
            return Err(ConfigurationError::Invalid {
                key: LOCK_INTERVAL_VAR,
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }

    pub fn jitter(&self) -> Result<f64> {
        let jitter = match self.config.get_float(LOCK_JITTER_VAR) {
            Ok(v) => v,
            Err(ConfigError::NotFound(_)) => 0.0,
            Err(e) => return Err(e.into()),
        };
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigurationError::Invalid {
                key: LOCK_JITTER_VAR,
                reason: format!("{} is not between 0 and 1", jitter),
            });
        }
        Ok(jitter)
    }

    pub fn verify_owner(&self) -> Result<bool> {
        match self.config.get_bool(VERIFY_OWNER_VAR) {
            Ok(v) => Ok(v),
            Err(ConfigError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn lock_key(&self) -> Result<LockKey> {
        Ok(LockKey::new(self.table()?, self.key_name()?, self.lock_name()?))
    }

    pub fn acquire_options(&self) -> Result<AcquireOptions> {
        Ok(AcquireOptions {
            owner: self.identifier()?,
            timeout: self.timeout()?,
            retry_interval: self.retry_interval()?,
            jitter: self.jitter()?,
        })
    }

    // ========================================================================
    // Store Configuration
    // ========================================================================

    pub fn region(&self) -> Result<Option<String>> {
        self.string_opt(REGION_VAR)
    }

    pub fn endpoint(&self) -> Result<Option<String>> {
        self.string_opt(ENDPOINT_VAR)
    }

    pub fn store_timeout_ms(&self) -> Result<Option<u64>> {
        match self.config.get_int(STORE_TIMEOUT_MS_VAR) {
            Ok(v) => u64::try_from(v)
                .map(Some)
                .map_err(|_| ConfigurationError::Invalid {
                    key: STORE_TIMEOUT_MS_VAR,
                    reason: format!("{} is negative", v),
                }),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn dynamodb_config(&self) -> Result<DynamoDbConfig> {
        Ok(DynamoDbConfig {
            region: self.region()?,
            endpoint: self.endpoint()?,
            timeout_ms: self.store_timeout_ms()?,
        })
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn log_level(&self) -> Result<Level> {
        let level = self.string_or(LOG_LEVEL_VAR, DEFAULT_LOG_LEVEL)?;
        level
            .parse()
            .map_err(|_| ConfigurationError::Invalid {
                key: LOG_LEVEL_VAR,
                reason: format!("unknown level '{}'", level),
            })
    }

    pub fn logging_config(&self) -> Result<LoggingConfig> {
        Ok(LoggingConfig {
            log_dir: self.string_opt(LOG_DIR_VAR)?.map(PathBuf::from),
            level: self.log_level()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dynalock").chain(args.iter().copied())).unwrap()
    }

    fn env(vars: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let configuration = Configuration::load_with_env(&cli(&["lock"]), env(&[])).unwrap();

        assert_eq!(configuration.timeout_minutes().unwrap(), 30);
        assert_eq!(configuration.table().unwrap(), "github-action-locks");
        assert_eq!(configuration.key_name().unwrap(), "LockID");
        assert_eq!(configuration.lock_name().unwrap(), "foobar");
        assert_eq!(configuration.identifier().unwrap(), None);
        assert_eq!(configuration.retry_interval().unwrap(), Duration::from_secs(5));
        assert_eq!(configuration.jitter().unwrap(), 0.0);
        assert!(!configuration.verify_owner().unwrap());
        assert_eq!(configuration.log_level().unwrap(), Level::INFO);

        let options = configuration.acquire_options().unwrap();
        assert_eq!(options.timeout, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_environment_inputs() {
        let configuration = Configuration::load_with_env(
            &cli(&["lock"]),
            env(&[
                ("INPUT_TIMEOUT", "1"),
                ("INPUT_TABLE", "locks"),
                ("INPUT_NAME", "ci-job-42"),
                ("INPUT_IDENTIFIER", "run-7"),
                ("INPUT_JITTER", "0.25"),
            ]),
        )
        .unwrap();

        assert_eq!(
            configuration.lock_key().unwrap(),
            LockKey::new("locks", "LockID", "ci-job-42")
        );
        let options = configuration.acquire_options().unwrap();
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.owner.as_deref(), Some("run-7"));
        assert_eq!(options.jitter, 0.25);
    }

    #[test]
    fn test_environment_strings_are_kept_verbatim() {
        let configuration = Configuration::load_with_env(
            &cli(&["lock"]),
            env(&[
                ("INPUT_NAME", "1.10"),
                ("INPUT_TABLE", "007"),
                ("INPUT_KEY", "true"),
                ("INPUT_IDENTIFIER", "0042"),
            ]),
        )
        .unwrap();

        assert_eq!(
            configuration.lock_key().unwrap(),
            LockKey::new("007", "true", "1.10")
        );
        assert_eq!(configuration.identifier().unwrap().as_deref(), Some("0042"));
    }

    #[test]
    fn test_environment_typed_values() {
        let configuration = Configuration::load_with_env(
            &cli(&["unlock"]),
            env(&[
                ("INPUT_TIMEOUT", "3"),
                ("INPUT_INTERVAL", "2"),
                ("INPUT_JITTER", "0.5"),
                ("INPUT_VERIFY_OWNER", "true"),
                ("INPUT_IDENTIFIER", "run-1"),
            ]),
        )
        .unwrap();

        assert_eq!(configuration.timeout().unwrap(), Duration::from_secs(180));
        assert_eq!(configuration.retry_interval().unwrap(), Duration::from_secs(2));
        assert_eq!(configuration.jitter().unwrap(), 0.5);
        assert!(configuration.verify_owner().unwrap());
    }

    #[test]
    fn test_oversized_timeout_is_rejected() {
        let err = Configuration::load_with_env(
            &cli(&["lock", "--timeout", "9223372036854775807"]),
            env(&[]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: LOCK_TIMEOUT_VAR,
                ..
            }
        ));

        let configuration = Configuration::load_with_env(
            &cli(&["lock"]),
            env(&[("INPUT_TIMEOUT", "307445734561825860")]),
        )
        .unwrap();
        assert_eq!(
            configuration.acquire_options().unwrap().timeout,
            Duration::from_secs(307445734561825860 * 60)
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let configuration = Configuration::load_with_env(
            &cli(&["lock", "--table", "from-flag", "--timeout", "2"]),
            env(&[("INPUT_TABLE", "from-env"), ("INPUT_TIMEOUT", "10")]),
        )
        .unwrap();

        assert_eq!(configuration.table().unwrap(), "from-flag");
        assert_eq!(configuration.timeout_minutes().unwrap(), 2);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "table = \"from-file\"\nkey = \"Resource\"\nname = \"deploy\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let configuration = Configuration::load_with_env(
            &cli(&["--config", &path, "unlock"]),
            env(&[("INPUT_NAME", "from-env")]),
        )
        .unwrap();

        assert_eq!(configuration.table().unwrap(), "from-file");
        assert_eq!(configuration.key_name().unwrap(), "Resource");
        assert_eq!(configuration.lock_name().unwrap(), "from-env");
    }

    #[test]
    fn test_empty_identifier_means_none() {
        let configuration =
            Configuration::load_with_env(&cli(&["lock"]), env(&[("INPUT_IDENTIFIER", "")]))
                .unwrap();
        assert_eq!(configuration.identifier().unwrap(), None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Configuration::load_with_env(&cli(&["lock"]), env(&[("INPUT_TIMEOUT", "-1")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: LOCK_TIMEOUT_VAR,
                ..
            }
        ));

        let err = Configuration::load_with_env(&cli(&["lock", "--jitter", "1.5"]), env(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: LOCK_JITTER_VAR,
                ..
            }
        ));

        let err = Configuration::load_with_env(&cli(&["lock", "--interval", "0"]), env(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: LOCK_INTERVAL_VAR,
                ..
            }
        ));

        assert!(
            Configuration::load_with_env(&cli(&["lock"]), env(&[("INPUT_TIMEOUT", "soon")]))
                .is_err()
        );
    }

    #[test]
    fn test_verify_owner_requires_identifier() {
        let err = Configuration::load_with_env(&cli(&["unlock", "--verify-owner"]), env(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: VERIFY_OWNER_VAR,
                ..
            }
        ));

        let configuration = Configuration::load_with_env(
            &cli(&["unlock", "--verify-owner", "--identifier", "run-1"]),
            env(&[]),
        )
        .unwrap();
        assert!(configuration.verify_owner().unwrap());
    }

    #[test]
    fn test_store_config() {
        let configuration = Configuration::load_with_env(
            &cli(&["lock", "--endpoint", "http://localhost:8000"]),
            env(&[("INPUT_REGION", "eu-west-1"), ("INPUT_STORE_TIMEOUT_MS", "2500")]),
        )
        .unwrap();

        let store = configuration.dynamodb_config().unwrap();
        assert_eq!(store.region.as_deref(), Some("eu-west-1"));
        assert_eq!(store.endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(store.timeout_ms, Some(2500));
    }

    #[test]
    fn test_log_level_flag() {
        let configuration =
            Configuration::load_with_env(&cli(&["--log-level", "debug", "lock"]), env(&[]))
                .unwrap();
        assert_eq!(configuration.log_level().unwrap(), Level::DEBUG);

        assert!(
            Configuration::load_with_env(&cli(&["--log-level", "loud", "lock"]), env(&[]))
                .is_err()
        );
    }
}
