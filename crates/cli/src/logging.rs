//! Subscriber setup: console plus a daily log file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use aipro_news_core::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// `<dir>/<prefix>_<YYYYMMDD>.log`
pub fn log_file_path(config: &LoggingConfig, today: NaiveDate) -> PathBuf {
    config
        .dir
        .join(format!("{}_{}.log", config.file_prefix, today.format("%Y%m%d")))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_logging(config: &LoggingConfig, today: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create log dir {:?}", config.dir))?;
    let path = log_file_path(config, today);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level {:?}", config.level))?;

    let file_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed()
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}
