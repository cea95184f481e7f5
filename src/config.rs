// src/config.rs
use crate::constants::{
    DEFAULT_BASE_DELAY_SECONDS, DEFAULT_JITTER_SECONDS, DEFAULT_MAX_ATTEMPTS, MAX_WORKERS_LIMIT,
};
use crate::error::HarvestError;
use crate::fetch::{default_worker_count, FailureMode, FetchOrchestrator, RetryPolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_MAX_WORKERS: &str = "HARVEST_MAX_WORKERS";
pub const ENV_MAX_ATTEMPTS: &str = "HARVEST_MAX_ATTEMPTS";
pub const ENV_BASE_DELAY: &str = "HARVEST_BASE_DELAY";
pub const ENV_JITTER_MIN: &str = "HARVEST_JITTER_MIN";
pub const ENV_JITTER_MAX: &str = "HARVEST_JITTER_MAX";
pub const ENV_MAX_DELAY: &str = "HARVEST_MAX_DELAY";
pub const ENV_FAIL_FAST: &str = "HARVEST_FAIL_FAST";

/// Parsed command-line input of the `category-tree` tool.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and build category tree documents", long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,

    /// Log file path (defaults to the temp dir)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print an indented outline of a tree document
    Outline {
        /// Exported tree document (JSON)
        tree: PathBuf,
    },
    /// Print every category id in pre-order, sentinel included
    Ids { tree: PathBuf },
    /// Print a category id and all of its descendants
    Closure {
        tree: PathBuf,
        /// Category id to expand
        id: String,
    },
    /// Build a tree document from a nested category listing
    Build {
        /// Nested listing (JSON array of entries with optional `children`)
        listing: PathBuf,
        /// Where to write the tree document (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Link two record collections through the tree and print both maps
    Associate {
        tree: PathBuf,
        /// Records `[{"id", "categoryId"}]` that own categories (e.g. posts)
        records_a: PathBuf,
        /// Records linked to them (e.g. downloads)
        records_b: PathBuf,
    },
}

/// Orchestrator and retry settings shared by every fetch stage.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    pub max_workers: usize,
    pub mode: FailureMode,
    pub max_attempts: u32,
    pub base_delay_seconds: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    pub max_delay_seconds: Option<f64>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_workers: default_worker_count(),
            mode: FailureMode::CollectErrors,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_seconds: DEFAULT_BASE_DELAY_SECONDS,
            jitter_min: DEFAULT_JITTER_SECONDS.0,
            jitter_max: DEFAULT_JITTER_SECONDS.1,
            max_delay_seconds: None,
        }
    }
}

impl HarvestConfig {
    /// Reads overrides from `HARVEST_*` environment variables.
    pub fn from_env() -> Result<Self, HarvestError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarvestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workers) = parse_var::<usize>(&lookup, ENV_MAX_WORKERS)? {
            if workers == 0 || workers > MAX_WORKERS_LIMIT {
                log::warn!(
                    "{}={} outside 1..={}, clamping",
                    ENV_MAX_WORKERS,
                    workers,
                    MAX_WORKERS_LIMIT
                );
            }
            config.max_workers = workers.clamp(1, MAX_WORKERS_LIMIT);
        }
        if let Some(attempts) = parse_var(&lookup, ENV_MAX_ATTEMPTS)? {
            config.max_attempts = attempts;
        }
        if let Some(base) = parse_var(&lookup, ENV_BASE_DELAY)? {
            config.base_delay_seconds = base;
        }
        if let Some(min) = parse_var(&lookup, ENV_JITTER_MIN)? {
            config.jitter_min = min;
        }
        if let Some(max) = parse_var(&lookup, ENV_JITTER_MAX)? {
            config.jitter_max = max;
        }
        if let Some(max_delay) = parse_var(&lookup, ENV_MAX_DELAY)? {
            config.max_delay_seconds = Some(max_delay);
        }
        if let Some(raw) = lookup(ENV_FAIL_FAST) {
            config.mode = if parse_flag(ENV_FAIL_FAST, &raw)? {
                FailureMode::FailFast
            } else {
                FailureMode::CollectErrors
            };
        }

        // Surface bad retry settings now rather than at the first batch.
        config.retry_policy()?;
        Ok(config)
    }

    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> Result<RetryPolicy, HarvestError> {
        let policy = RetryPolicy::new(
            self.max_attempts,
            self.base_delay_seconds,
            (self.jitter_min, self.jitter_max),
        )?;
        match self.max_delay_seconds {
            Some(seconds) => {
                let cap = Duration::try_from_secs_f64(seconds).map_err(|e| {
                    HarvestError::InvalidConfiguration(format!(
                        "{} must be a non-negative number of seconds: {}",
                        ENV_MAX_DELAY, e
                    ))
                })?;
                Ok(policy.with_max_delay(cap))
            }
            None => Ok(policy),
        }
    }

    pub fn orchestrator(&self) -> Result<FetchOrchestrator, HarvestError> {
        Ok(FetchOrchestrator::new(
            self.retry_policy()?,
            self.max_workers,
            self.mode,
        ))
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, HarvestError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            HarvestError::InvalidConfiguration(format!("{}={:?}: {}", name, raw, e))
        }),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, HarvestError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HarvestError::InvalidConfiguration(format!(
            "{}={:?} is not a boolean",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = HarvestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.mode, FailureMode::CollectErrors);
    }

    #[test]
    fn test_env_overrides() {
        let config = HarvestConfig::from_lookup(lookup(&[
            (ENV_MAX_WORKERS, "8"),
            (ENV_MAX_ATTEMPTS, "5"),
            (ENV_BASE_DELAY, "1.5"),
            (ENV_JITTER_MIN, "0.5"),
            (ENV_JITTER_MAX, "2"),
            (ENV_MAX_DELAY, "30"),
            (ENV_FAIL_FAST, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.mode, FailureMode::FailFast);

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.jitter(), (0.5, 2.0));
        assert_eq!(policy.max_delay(), Some(Duration::from_secs(30)));
        assert_eq!(config.orchestrator().unwrap().max_workers(), 8);
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let config = HarvestConfig::from_lookup(lookup(&[(ENV_MAX_WORKERS, "500")])).unwrap();
        assert_eq!(config.max_workers, MAX_WORKERS_LIMIT);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for vars in [
            [(ENV_MAX_WORKERS, "many")],
            [(ENV_MAX_ATTEMPTS, "0")],
            [(ENV_JITTER_MIN, "-1")],
            [(ENV_FAIL_FAST, "maybe")],
            [(ENV_MAX_DELAY, "-3")],
        ] {
            assert!(
                matches!(
                    HarvestConfig::from_lookup(lookup(&vars)),
                    Err(HarvestError::InvalidConfiguration(_))
                ),
                "{:?} should be rejected",
                vars
            );
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = CommandLineInput::parse_from(["category-tree", "-v", "closure", "tree.json", "12"]);
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Closure {
                tree: PathBuf::from("tree.json"),
                id: "12".to_string()
            }
        );
    }
}
