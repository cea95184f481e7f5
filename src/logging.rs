// src/logging.rs
//! log4rs setup for binaries built on this crate.
//!
//! The library itself only talks to the `log` facade.

use crate::constants::LOG_FILE_NAME;
use crate::error::HarvestError;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::path::PathBuf;

const TIMESTAMPED_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Debug level on the console instead of warnings only.
    pub verbose: bool,
    /// Log file; defaults to [`LoggingConfig::default_log_path`].
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn default_log_path() -> PathBuf {
        std::env::temp_dir().join(LOG_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(Self::default_log_path)
    }

    fn console_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

/// Builds the log4rs configuration: console on stderr, everything at debug
/// level and above to the log file.
pub fn build_logging_config(config: &LoggingConfig) -> Result<Config, HarvestError> {
    let log_file_path = config.log_path();
    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let console_pattern = if config.verbose {
        TIMESTAMPED_PATTERN
    } else {
        "{m}{n}"
    };

    // stdout carries command output, so logs go to stderr.
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(console_pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(TIMESTAMPED_PATTERN)))
        .build(&log_file_path)?;

    Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(config.console_level())))
                .build("console", Box::new(console_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(LevelFilter::Debug),
        )
        .map_err(|e| HarvestError::InvalidConfiguration(format!("Logging setup failed: {}", e)))
}

/// Installs the global logger. Call once, from `main`.
pub fn setup_logging(config: &LoggingConfig) -> Result<(), HarvestError> {
    let log_config = build_logging_config(config)?;
    log4rs::init_config(log_config).map_err(|e| HarvestError::InternalError {
        message: "Logger already initialized".to_string(),
        source: Some(Box::new(e)),
    })?;
    log::info!("Logging initialized. Log file: {}", config.log_path().display());
    Ok(())
}
