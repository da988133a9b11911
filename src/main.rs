//! Plunger - find, wait for and override stuck Ethereum transactions
//!
//! Collects an account's pending transactions from one or more sources,
//! prints them, and optionally replaces each with a zero-value transfer to
//! self and waits until the account's nonce has moved past all of them.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tokio::signal;
use tracing::{info, warn};

mod chain;
mod cli;
mod config;
mod error;
mod reconcile;
mod report;
mod sources;
mod tx;

use cli::Cli;
use config::{LoggingConfig, Settings};
use error::PlungerError;
use reconcile::Plunger;
use report::{ReportFormat, Reporter};

/// Conventional exit status after SIGINT
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<PlungerError>() {
            // Usage problems read better without the prefix
            Some(err) if err.is_configuration() => {
                eprintln!("{}", err);
                ExitCode::from(err.exit_code() as u8)
            }
            Some(err) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(err.exit_code() as u8)
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Everything that can be rejected offline is rejected before connecting
    let kinds = cli.sources()?;
    let account = cli.account()?;
    let settings = Settings::from_cli(&cli)?;

    init_logging(&settings.logging);
    info!("Starting plunger v{}", env!("CARGO_PKG_VERSION"));

    let plunger = Plunger::connect(&settings, &kinds, account)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.endpoint_uri()))?;

    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let mut reporter = Reporter::new(format, plunger.chain(), plunger.account(), io::stdout());

    tokio::select! {
        result = plunger.run(cli.action(), &mut reporter) => result?,
        _ = shutdown_signal() => {
            warn!("Interrupted, replacement transactions already sent stay in the pool");
            return Ok(ExitCode::from(INTERRUPTED));
        }
    }

    reporter.finish().context("Failed to write report")?;
    Ok(ExitCode::SUCCESS)
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("warn,plunger=debug")
        } else {
            EnvFilter::new("warn,plunger=info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
