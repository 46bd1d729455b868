//! Main entry point for the dynalock command line tool.
//!
//! Exit status is 0 when the lock was created (`lock`) or is no longer held
//! (`unlock`), and 1 on any configuration, store or timeout failure.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dynalock::cli::Cli;
use dynalock::commands;
use dynalock::configuration::Configuration;
use dynalock::logging;
use dynalock_dynamodb::DynamoDbStore;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let configuration = match Configuration::load(&cli) {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let logging_config = match configuration.logging_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid logging configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _logging_guard = match logging::init_logging(&logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let store_config = match configuration.dynamodb_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid store configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = Arc::new(DynamoDbStore::from_env(store_config).await);

    match commands::run(&cli.command, &configuration, store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
