//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DYNAMIC_SUITE";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Output directory from DYNAMIC_SUITE_OUTPUT_DIR
    pub output_dir: Option<String>,
    /// Log level from DYNAMIC_SUITE_LOG_LEVEL
    pub log_level: Option<String>,
    /// Parallel from DYNAMIC_SUITE_PARALLEL
    pub parallel: Option<bool>,
    /// Concurrency from DYNAMIC_SUITE_CONCURRENT
    pub concurrent: Option<usize>,
    /// Keyword timeout from DYNAMIC_SUITE_TIMEOUT
    pub timeout: Option<u64>,
    /// Config file from DYNAMIC_SUITE_CONFIG
    pub config_file: Option<String>,
    /// Output format from DYNAMIC_SUITE_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            output_dir: get_env("OUTPUT_DIR"),
            log_level: get_env("LOG_LEVEL"),
            parallel: get_env_bool("PARALLEL"),
            concurrent: get_env_parse("CONCURRENT"),
            timeout: get_env_parse("TIMEOUT"),
            config_file: get_env("CONFIG"),
            format: get_env("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.output_dir.is_some()
            || self.log_level.is_some()
            || self.parallel.is_some()
            || self.concurrent.is_some()
            || self.timeout.is_some()
            || self.config_file.is_some()
            || self.format.is_some()
    }

    /// Get output format with fallback
    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_OUTPUT_DIR: {:?}", ENV_PREFIX, self.output_dir);
        println!("  {}_LOG_LEVEL:  {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_PARALLEL:   {:?}", ENV_PREFIX, self.parallel);
        println!("  {}_CONCURRENT: {:?}", ENV_PREFIX, self.concurrent);
        println!("  {}_TIMEOUT:    {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_CONFIG:     {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_FORMAT:     {:?}", ENV_PREFIX, self.format);
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_OUTPUT_DIR"), dir.into()));
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_LOG_LEVEL"), level.into()));
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_PARALLEL"), parallel.to_string()));
        self
    }

    pub fn concurrent(mut self, concurrent: usize) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_CONCURRENT"), concurrent.to_string()));
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_TIMEOUT"), seconds.to_string()));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_FORMAT"), format.into()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all DYNAMIC_SUITE environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_OUTPUT_DIR   Directory for artifacts, reports and logs");
    println!("  {ENV_PREFIX}_LOG_LEVEL    Console log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_PARALLEL     Run tests concurrently (true/false)");
    println!("  {ENV_PREFIX}_CONCURRENT   Maximum concurrent tests");
    println!("  {ENV_PREFIX}_TIMEOUT      Library keyword timeout in seconds");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_FORMAT       Console format (table, json, json-pretty, csv, summary)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_OUTPUT_DIR=runs");
    println!("  export {ENV_PREFIX}_PARALLEL=true");
    println!("  dynamic-suite tutorial --all");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.output_dir.is_none());
        assert!(!config.has_any());
        assert_eq!(config.format_or("table"), "table");
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .output_dir("/tmp/dynamic-suite")
            .concurrent(6)
            .timeout(45)
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.output_dir, Some("/tmp/dynamic-suite".to_string()));
        assert_eq!(config.concurrent, Some(6));
        assert_eq!(config.timeout, Some(45));
        assert!(config.has_any());
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = EnvBuilder::new().parallel(true).apply_scoped();
        assert_eq!(EnvConfig::load().parallel, Some(true));
    }

    #[test]
    fn test_guard_restores() {
        let key = format!("{ENV_PREFIX}_FORMAT");
        {
            let _guard = EnvBuilder::new().format("csv").apply_scoped();
            assert_eq!(env::var(&key).ok(), Some("csv".to_string()));
        }
        assert!(env::var(&key).is_err());
    }

    #[test]
    fn test_log_level_from_env() {
        let _guard = EnvBuilder::new().log_level("debug").apply_scoped();
        let config = EnvConfig::load();
        assert_eq!(config.log_level, Some("debug".to_string()));
    }
}
