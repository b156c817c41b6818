//! SmartSource - hybrid document retrieval
//!
//! Main entry point for the SmartSource CLI.

mod cli;
mod cmd_config;
mod cmd_search;
mod register;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smartsource_config::{ConfigLoader, LogFormat, LoggingConfig};

use cli::{Cli, Commands};

/// Initialize tracing on stderr, plus a daily-rolling file when a log
/// directory is configured. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    // stdout carries JSON responses, so console logs go to stderr.
    let (text_layer, json_layer) = match logging.format {
        LogFormat::Text => (
            Some(fmt::layer().with_writer(std::io::stderr).with_target(true)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    let file_layer = match &logging.directory {
        Some(directory) => {
            let log_dir = ConfigLoader::expand_path(directory);
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("smartsource")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard flushes buffered lines on drop; keep it for the process lifetime.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cmd_config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting SmartSource v{}", env!("CARGO_PKG_VERSION"));

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::CheckConfig => match cmd_config::check_config(&config) {
            Ok((report, valid)) => {
                print!("{}", report);
                if valid {
                    Ok(())
                } else {
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => Err(e.into()),
        },
        Commands::Search(args) => match cmd_search::build_engine(&config).await {
            Ok(engine) => cmd_search::run_search(&engine, &args.text, &args.options)
                .await
                .map(|json| println!("{}", json)),
            Err(e) => Err(e.into()),
        },
        Commands::Repl(args) => match cmd_search::build_engine(&config).await {
            Ok(engine) => cmd_search::repl(&engine, &args.options).await,
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
