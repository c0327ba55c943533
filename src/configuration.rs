//! Config for the benchmark runner behaviors
//!
//! This module provides configuration options for controlling the behavior of the runner.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive: set the value to `"true"` to enable a flag.
//!
//! - `BENCH_VERBOSE`: print progress and error summaries to stdout (default: `true`)
//! - `BENCH_LOG`: enable logging to a file (default: `false`)
//! - `BENCH_LOG_DIR`: directory of the log file (default: current directory)
//! - `BENCH_RETRY_ATTEMPTS`: attempts per model call (default: `3`)
//! - `BENCH_RETRY_DELAY_MS`: pause between two attempts, in milliseconds (default: `1000`)
//! - `BENCH_EXPERIMENTS`: comma separated names of the experiments to run (default: all)

use std::path::PathBuf;
use std::time::Duration;

use crate::model::RetryPolicy;

/// Configuration for benchmark runner behaviors.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) log_dir: PathBuf,
    pub(crate) retry: RetryPolicy,
    pub(crate) experiment_filter: Option<Vec<String>>,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The runner prints progress to stdout.
    /// - Logging to file is disabled.
    /// - Model calls are attempted 3 times, one second apart.
    /// - Every experiment is run.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            log_dir: PathBuf::from("."),
            retry: RetryPolicy::default(),
            experiment_filter: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Unset or unparsable values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get_flag = |var: &str, default: bool| match lookup(var) {
            Some(val) => val.eq_ignore_ascii_case("true"),
            None => default,
        };
        let default = Self::new();

        let attempts = lookup("BENCH_RETRY_ATTEMPTS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default.retry.attempts);
        let delay = lookup("BENCH_RETRY_DELAY_MS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default.retry.delay);
        let experiment_filter = lookup("BENCH_EXPERIMENTS").map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect()
        });

        Self {
            verbose: get_flag("BENCH_VERBOSE", default.verbose),
            log: get_flag("BENCH_LOG", default.log),
            log_dir: lookup("BENCH_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.log_dir),
            retry: RetryPolicy { attempts, delay },
            experiment_filter,
        }
    }

    /// Enable or disable console output.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Directory the log file is created in.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Number of attempts per model call (at least one is always made).
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry.attempts = attempts;
        self
    }

    /// Pause between two attempts of a model call.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    /// Only run the experiments with these names.
    pub fn with_experiment_filter<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.experiment_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Retry policy for model calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// True if the experiment `name` passes the filter.
    pub fn runs_experiment(&self, name: &str) -> bool {
        self.experiment_filter
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Configuration {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Configuration::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn unset_environment_gives_defaults() {
        assert_eq!(from_vars(&[]), Configuration::new());
    }

    #[test]
    fn environment_overrides() {
        let config = from_vars(&[
            ("BENCH_VERBOSE", "FALSE"),
            ("BENCH_LOG", "True"),
            ("BENCH_LOG_DIR", "/tmp/logs"),
            ("BENCH_RETRY_ATTEMPTS", "5"),
            ("BENCH_RETRY_DELAY_MS", "250"),
            ("BENCH_EXPERIMENTS", "easy, hard,"),
        ]);
        assert!(!config.verbose);
        assert!(config.log);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.retry_policy().attempts, 5);
        assert_eq!(config.retry_policy().delay, Duration::from_millis(250));
        assert!(config.runs_experiment("hard"));
        assert!(!config.runs_experiment("medium"));
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = from_vars(&[("BENCH_RETRY_ATTEMPTS", "many")]);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn builder() {
        let config = Configuration::new()
            .with_verbose(false)
            .with_retry_attempts(1)
            .with_retry_delay(Duration::ZERO)
            .with_experiment_filter(["easy"]);
        assert!(!config.verbose);
        assert_eq!(config.retry_policy().attempts, 1);
        assert!(config.runs_experiment("easy"));
        assert!(!config.runs_experiment("hard"));
        assert!(Configuration::default().runs_experiment("anything"));
    }
}
