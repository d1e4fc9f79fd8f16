use super::commands::{Cli, OutputFormat};
use ethers::types::Address;
use serde::Serialize;
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use whistle_node::LoggingConfig;
use whistle_types::{WhistleError, WhistleResult};

pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> WhistleResult<()> {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => logging.level.to_string(),
            1 => "info,whistle_node=debug,whistle_crypto=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = logging.json || cli.format == OutputFormat::Json;
    let console_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(cli.verbose >= 2)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match cli.log_file.as_ref().or(logging.file.as_ref()) {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    WhistleError::Config(format!("Failed to open log file {:?}: {}", path, e))
                })?;
            Some(
                fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| WhistleError::Config(format!("Failed to initialise logging: {}", e)))
}

pub fn parse_address(s: &str) -> WhistleResult<Address> {
    Address::from_str(s.trim())
        .map_err(|e| WhistleError::Config(format!("Invalid address {:?}: {}", s, e)))
}

pub fn print_json<T: Serialize>(value: &T) -> WhistleResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| WhistleError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

pub fn print_header(title: &str) {
    println!("\x1b[38;5;46m{}\x1b[0m", title);
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
}
