//! Dynalock - distributed locks for CI jobs, stored in DynamoDB
//!
//! This crate provides the `dynalock` binary's building blocks:
//! - Command line arguments (`lock`, `unlock`)
//! - Layered configuration (file, `INPUT_*` environment, flags)
//! - Logging setup
//! - Subcommand execution against any `LockStore`

pub mod cli;
pub mod commands;
pub mod configuration;
pub mod logging;
