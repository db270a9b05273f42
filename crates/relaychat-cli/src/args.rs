//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use relaychat_core::{BackoffConfig, ConfigError, backoff};

/// File name of the local database inside the data directory.
pub const DATABASE_FILE: &str = "relaychat.redb";

/// Relaychat terminal client
#[derive(Parser, Debug)]
#[command(name = "relaychat")]
#[command(about = "Terminal chat client for a single WebSocket relay")]
#[command(version)]
pub struct Args {
    /// Relay URL to connect to
    #[arg(short, long, default_value = "ws://localhost:8080")]
    pub url: String,

    /// Display name (remembered for later runs)
    ///
    /// If not provided, the stored name is used, or a guest name is generated.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory holding the local message log
    #[arg(long, default_value = ".relaychat")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Delay before the first reconnection attempt, in milliseconds
    #[arg(long, default_value_t = backoff::DEFAULT_INITIAL_DELAY.as_millis() as u64)]
    pub initial_delay_ms: u64,

    /// Upper bound on the reconnection delay, in milliseconds
    #[arg(long, default_value_t = backoff::DEFAULT_MAX_DELAY.as_millis() as u64)]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt
    #[arg(long, default_value_t = backoff::DEFAULT_MULTIPLIER)]
    pub multiplier: f64,
}

impl Args {
    /// Validated reconnection parameters.
    pub fn backoff_config(&self) -> Result<BackoffConfig, ConfigError> {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        };
        config.validate()?;
        Ok(config)
    }
}
