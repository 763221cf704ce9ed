//! Configuration module
//!
//! Handles loading and layering configuration: CLI flags override
//! environment variables, which override the config file, which overrides
//! built-in defaults.

mod env;
mod file;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard, ENV_PREFIX};
pub use file::{expand_path, ConfigFile, CONFIG_LOCATIONS, SUPPORTED_VERSIONS};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::{RunOptions, DEFAULT_MAX_CONCURRENT};
use crate::utils::LogLevel;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory that relative output paths are resolved against
    pub output_dir: PathBuf,

    /// Console log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Run tests concurrently by default
    pub parallel: bool,

    /// Maximum concurrent tests
    pub max_concurrent: usize,

    /// Per library keyword timeout in seconds
    pub keyword_timeout_secs: Option<u64>,

    /// Colored console output
    pub colorize: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            parallel: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            keyword_timeout_secs: None,
            colorize: true,
        }
    }
}

impl AppConfig {
    /// Overlay values present in the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(dir) = &env.output_dir {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        if let Some(parallel) = env.parallel {
            self.parallel = parallel;
        }
        if let Some(concurrent) = env.concurrent {
            self.max_concurrent = concurrent;
        }
        if let Some(timeout) = env.timeout {
            self.keyword_timeout_secs = Some(timeout);
        }
    }

    /// Parsed log level, falling back to INFO
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_str(&self.log_level).unwrap_or(LogLevel::Info)
    }

    /// Execution options writing the artifact to `output`
    pub fn run_options(&self, output: impl Into<PathBuf>) -> RunOptions {
        let mut options = RunOptions::new(output);
        if self.parallel {
            options = options.with_parallel(self.max_concurrent);
        }
        if let Some(secs) = self.keyword_timeout_secs {
            options = options.with_keyword_timeout(Duration::from_secs(secs));
        }
        options
    }
}
