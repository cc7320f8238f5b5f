use crate::aggregator::ErrorMarkerPolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings shared by the coordinator and the workers.
///
/// Every field has a default so a config file only needs to name what it
/// changes; command line flags are applied on top of the loaded values.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Interface the coordinator listens on (all interfaces by default)
    pub bind_host: String,
    /// Coordinator host workers connect to
    pub host: String,
    pub port: u16,
    /// Pre-shared secret checked once per connection
    pub secret: String,
    /// Number of chunks each input file is split into
    pub chunks: usize,
    /// Number of peons started by a worker process
    pub workers: usize,
    /// Sleep between polls of an empty queue
    pub poll_interval_ms: u64,
    /// Time given to workers to observe the sentinel before the queues shut down
    pub grace_period_ms: u64,
    /// Maximum time to wait for all results (0 = wait forever)
    pub drain_timeout_ms: u64,
    pub error_marker_policy: ErrorMarkerPolicy,
    /// Output name (single file) or suffix (several files); stdout when absent
    pub output: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1444,
            secret: String::new(),
            chunks: 4,
            workers: 4,
            poll_interval_ms: 1000,
            grace_period_ms: 5000,
            drain_timeout_ms: 0,
            error_marker_policy: ErrorMarkerPolicy::default(),
            output: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject configurations that would expose an unauthenticated endpoint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        if self.drain_timeout_ms > 0 {
            Some(Duration::from_millis(self.drain_timeout_ms))
        } else {
            None
        }
    }
}
