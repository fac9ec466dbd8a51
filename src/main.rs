//! Tether - thread-affine run loops with a cron scheduler.
//!
//! Main entry point for the `tether` CLI.

mod cli;
mod cmd_check;
mod cmd_run;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use tether_config::{ConfigLoader, LoggingConfig};

use cli::{Cli, Commands};
use cmd_check::handle_check_command;
use cmd_run::handle_run_command;

/// Initialize tracing with console output and, when a directory is
/// configured, a daily rolling log file.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.directory {
        Some(directory) => {
            let log_dir = ConfigLoader::expand_path(directory);
            std::fs::create_dir_all(Path::new(&log_dir))?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("tether")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Dropping the guard stops the background writer.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(true)
                .with_thread_names(true),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { duration } => {
            let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
            init_tracing(&config.logging)?;
            handle_run_command(config, duration.map(Duration::from_secs)).await
        }
        Commands::Check { expr, json } => {
            init_tracing(&LoggingConfig::default())?;
            handle_check_command(&expr, json)
        }
    }
}
