use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt as tfmt};

/// Target of the one-line report every completed exchange emits.
pub const EXCHANGE_TARGET: &str = "exchange";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(level)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LogConfig {
    pub log_level: LogLevel,
    /// When set, a daily rolling text log and a JSON exchange report are
    /// written here next to the console output.
    pub log_dir: Option<PathBuf>,
    pub log_file: String,
    pub event_file: String,
}

impl LogConfig {
    pub fn new(log_level: LogLevel, log_dir: Option<PathBuf>) -> Self {
        Self {
            log_level,
            log_dir,
            ..Self::default()
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            log_file: "routekit.log".to_string(),
            event_file: "exchanges.json".to_string(),
        }
    }
}

/// Keeps the background log writers alive. Dropping it flushes them.
#[must_use = "dropping the guards stops the file writers"]
#[derive(Debug, Default)]
pub struct LogGuards {
    _writers: Vec<WorkerGuard>,
}

/// `RUST_LOG` wins over the configured level when it is set.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

fn report_filter() -> EnvFilter {
    EnvFilter::new(format!("{EXCHANGE_TARGET}=info"))
}

/// Install the global subscriber: console output always, plus the rolling
/// text log and the JSON exchange report when a log directory is set.
pub fn init_tracing(config: &LogConfig) -> Result<LogGuards> {
    let console = tfmt::layer()
        .with_thread_names(true)
        .with_filter(env_filter(config.log_level));

    let mut guards = Vec::new();
    let (text_layer, json_layer) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("could not create log directory {}", dir.display()))?;

            let text_appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.log_file);
            let (text_writer, text_guard) = tracing_appender::non_blocking(text_appender);
            guards.push(text_guard);
            let text_layer = tfmt::layer()
                .with_writer(text_writer)
                .with_ansi(false)
                .with_filter(env_filter(config.log_level));

            let json_appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.event_file);
            let (json_writer, json_guard) = tracing_appender::non_blocking(json_appender);
            guards.push(json_guard);
            let json_layer = tfmt::layer()
                .json()
                .with_writer(json_writer)
                .with_target(true)
                .with_filter(report_filter());

            (Some(text_layer), Some(json_layer))
        }
        None => (None, None),
    };

    Registry::default()
        .with(console)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(level = %config.log_level, dir = ?config.log_dir, "tracing initialised");
    Ok(LogGuards { _writers: guards })
}
