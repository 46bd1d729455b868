//! Command line arguments
//!
//! Every flag is optional so that an absent flag leaves the value coming from
//! the environment or the configuration file untouched.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Create a distributed lock for a GitHub Action
#[derive(Debug, Parser)]
#[command(name = "dynalock", version, about)]
pub struct Cli {
    /// Configuration file (yaml, toml, json, ...)
    #[arg(short = 'c', long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a lock
    Lock(LockArgs),
    /// Release a lock
    Unlock(UnlockArgs),
}

/// Where the lock lives
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// DynamoDB table to write the lock in
    #[arg(long)]
    pub table: Option<String>,

    /// Name of the column where we write locks
    #[arg(long)]
    pub key: Option<String>,

    /// Name of the lock
    #[arg(long)]
    pub name: Option<String>,

    /// AWS region of the table
    #[arg(long)]
    pub region: Option<String>,

    /// DynamoDB endpoint override (e.g. http://localhost:8000)
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LockArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// How long to wait to acquire a lock, in minutes
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Identifier recorded as the lock owner
    #[arg(long)]
    pub identifier: Option<String>,

    /// Seconds between two acquisition attempts
    #[arg(long)]
    pub interval: Option<u64>,

    /// Random spread applied to the interval, as a fraction between 0 and 1
    #[arg(long)]
    pub jitter: Option<f64>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UnlockArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Identifier the lock must have been created with
    #[arg(long)]
    pub identifier: Option<String>,

    /// Refuse to release a lock recorded with a different identifier
    #[arg(long)]
    pub verify_owner: bool,
}

impl Command {
    pub fn target(&self) -> &TargetArgs {
        match self {
            Command::Lock(args) => &args.target,
            Command::Unlock(args) => &args.target,
        }
    }
}
