//! Tracing subscriber setup.
//!
//! The TUI owns stdout, so logs default to a file. `RUST_LOG` controls the
//! filter (default `info`).

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::error::AppError;

pub fn init(config: &AppConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::config(format!("Failed to open log file '{}': {e}", path.display())))?;
            let writer = Mutex::new(file);
            if config.log_json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                    .try_init()
            }
        }
        None => {
            if config.log_json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                    .try_init()
            }
        }
    };

    result.map_err(|e| AppError::config(format!("Failed to initialize logging: {e}")))
}
