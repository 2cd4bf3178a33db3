//! bcmaps Binary
//!
//! Webhook listener that keeps the business capability maps current.

use anyhow::Context;
use bcmaps_listener::cli::{Cli, RunContext};
use bcmaps_listener::config::ConfigLoader;
use bcmaps_listener::logging::{init_logging, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("bcmaps starting");

    let context = match RunContext::new(cli.root.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", bcmaps_listener::cli::map_error(&e));
            process::exit(1);
        }
    };

    match run(&context, &cli) {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => info!("bcmaps stopped"),
        Err(e) => {
            error!("Command failed: {:#}", e);
            match e.downcast_ref::<bcmaps_listener::error::ApiError>() {
                Some(api_error) => eprintln!("{}", bcmaps_listener::cli::map_error(api_error)),
                None => eprintln!("{:#}", e),
            }
            process::exit(1);
        }
    }
}

fn run(context: &RunContext, cli: &Cli) -> anyhow::Result<Option<String>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(context.execute(&cli.command))?)
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.root)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }

    config
}
