// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the initial log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PLUGWATCH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! The returned [`LogHandle`] lets the `debug` control command flip the
//! level between INFO and DEBUG at runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, fmt, reload};

use crate::cli::LogLevel;

/// Handle for changing the log level after startup.
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<LevelFilter, Registry>,
    debug: Arc<AtomicBool>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("debug", &self.is_debug())
            .finish()
    }
}

impl LogHandle {
    /// Switch between DEBUG and INFO verbosity.
    pub fn set_debug(&self, enabled: bool) -> Result<()> {
        let level = if enabled { Level::DEBUG } else { Level::INFO };
        self.handle
            .reload(LevelFilter::from_level(level))
            .context("reloading log level filter")?;
        self.debug.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }
}

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<LogHandle> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("PLUGWATCH_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO),
    };

    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    Ok(LogHandle {
        handle,
        debug: Arc::new(AtomicBool::new(level >= Level::DEBUG)),
    })
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
