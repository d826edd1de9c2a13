//! docsync CLI Binary
//!
//! Administrative command-line interface over the document sync backends.

use anyhow::Context;
use clap::Parser;
use docsync::cli::{load_config, Cli, RunContext, RunOptions};
use docsync::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;

    info!(command = cli.command.name(), "docsync starting");

    let context = match RunContext::new(RunOptions {
        uid: cli.uid.clone(),
        sync_version: cli.sync_version,
        data_dir: cli.data_dir.clone(),
        config_path: cli.config.clone(),
    }) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error opening storage: {}", e);
            eprintln!("{}", docsync::cli::map_error(&e));
            process::exit(docsync::cli::exit_code(&e));
        }
    };

    let result = context.execute(&cli.command);
    context.flush_notifications();

    match result {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", docsync::cli::map_error(&e));
            process::exit(docsync::cli::exit_code(&e));
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    if !cli.verbose {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
