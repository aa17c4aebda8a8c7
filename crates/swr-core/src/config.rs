//! Coordinator runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the coordinator and its background runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Query parameter that triggers a forced refresh. Stripped from derived
    /// cache keys.
    #[serde(default = "default_control_param")]
    pub control_param: String,
    /// Number of background refresh workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum number of queued refresh jobs.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Seconds to wait for in-flight refreshes on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_control_param() -> String {
    "force_refresh".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_depth() -> usize {
    64
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            control_param: default_control_param(),
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the forced-refresh control parameter name.
    pub fn with_control_param(mut self, name: impl Into<String>) -> Self {
        self.control_param = name.into();
        self
    }

    /// Set the number of refresh workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the refresh queue depth.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Set the shutdown grace period in seconds.
    pub fn with_shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = secs;
        self
    }

    /// Shutdown grace period as a duration.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
