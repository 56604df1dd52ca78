//! Structured logging setup
//!
//! Installs a global `tracing` subscriber built from [`LoggingConfig`].
//! Console output goes to stderr; file output appends to `log_file`.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{CodecError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(writer: W, json: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).boxed()
    }
}

/// Install the global subscriber.
///
/// Fails with `ConfigError` if the configuration is invalid, the log file
/// cannot be opened, or a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(CodecError::ConfigError(errors.join("; ")));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.log_to_console {
        layers.push(output_layer(std::io::stderr, config.json_format));
    }
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CodecError::ConfigError(format!("Failed to open log file: {e}")))?;
        layers.push(output_layer(Mutex::new(file), config.json_format));
    }

    let filter = tracing_subscriber::filter::LevelFilter::from_level(config.log_level);
    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|e| CodecError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
