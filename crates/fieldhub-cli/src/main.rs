//! FieldHub CLI - manage field groups, migrations and location rules.

mod commands;
mod config;
mod error;
mod formatter;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldhub_core::FieldHub;

use crate::commands::execute;
use crate::config::Args;
use crate::formatter::create_formatter;

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldhub=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let (config, command) = args.into_config();
    let formatter = create_formatter(config.format);

    tracing::debug!(
        data_path = %config.hub.storage.path.display(),
        migrations_dir = ?config.hub.migrations_dir,
        "configuration loaded"
    );

    let hub = match FieldHub::open(config.hub.clone()) {
        Ok(hub) => hub,
        Err(e) => {
            tracing::error!(error = %e, "failed to open data directory");
            eprintln!("{}", formatter.format_error(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    let result = execute(&hub, &config, command, formatter.as_ref());
    if let Err(e) = hub.flush() {
        tracing::warn!(error = %e, "flush failed");
    }

    match result {
        Ok(output) => {
            println!("{}", output.text);
            if output.failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
