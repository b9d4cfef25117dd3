//! Logging setup
//!
//! Installs the global `tracing` subscriber according to the `logging`
//! configuration section. `RUST_LOG` overrides the configured level.

mod rotating;

use std::str::FromStr;
use std::sync::Mutex;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

pub use rotating::{RotatingFile, MAX_LOG_BYTES};

use crate::config::{LogSink, LoggingConfig};

const DEFAULT_LEVEL: Level = Level::DEBUG;

/// Map a configured level name, accepting the usual aliases
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "critical" | "fatal" => Some(Level::ERROR),
        other => Level::from_str(other).ok(),
    }
}

pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    if !config.enabled || config.sink == LogSink::Null {
        return Ok(());
    }

    let level = parse_level(&config.level);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.unwrap_or(DEFAULT_LEVEL)).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true);

    let installed = match config.sink {
        LogSink::File => {
            let file = RotatingFile::open(&config.path, MAX_LOG_BYTES)
                .with_context(|| format!("Failed to open log file {}", config.path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        _ => builder.with_writer(std::io::stdout).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    if level.is_none() {
        warn!(
            "Unknown log level {:?}, using {}",
            config.level, DEFAULT_LEVEL
        );
    }
    info!("Logging configuration: {:?}", config);
    Ok(())
}
