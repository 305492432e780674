//! Service configuration from flags and environment variables.

use clap::{Args, ValueEnum};
use std::time::Duration;

use crate::cluster::kubernetes::DEFAULT_REQUEST_TIMEOUT;
use crate::error::ConfigError;
use crate::receiver::{ReceiverConfig, DEFAULT_MAX_WORKERS, DEFAULT_QUEUE_CAPACITY};

/// Which cluster metadata backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ClusterBackend {
    /// Always answers affirmatively; no cluster access needed
    #[default]
    Stub,
    /// Query the Kubernetes API using the ambient kubeconfig
    Kube,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Runtime settings for the alerts processor service.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address to bind the webhook server to
    #[arg(long, env = "ALERTS_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Number of alerts processed concurrently
    #[arg(long, env = "ALERTS_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Number of alerts that may wait for a free worker
    #[arg(long, env = "ALERTS_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Cluster metadata backend
    #[arg(long, env = "ALERTS_CLUSTER_BACKEND", value_enum, default_value_t = ClusterBackend::Stub)]
    pub cluster_backend: ClusterBackend,

    /// Time limit for each Kubernetes API request, in seconds
    #[arg(long, env = "ALERTS_CLUSTER_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub cluster_timeout_secs: u64,

    /// Time limit for one alert's full pipeline run, in seconds (unset = none)
    #[arg(long, env = "ALERTS_ALERT_TIMEOUT_SECS")]
    pub alert_timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, env = "ALERTS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            cluster_backend: ClusterBackend::Stub,
            cluster_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            alert_timeout_secs: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Reject settings that would leave the service unable to make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Zero {
                field: "max_workers",
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "queue_capacity",
            });
        }
        if self.cluster_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "cluster_timeout_secs",
            });
        }
        if self.alert_timeout_secs == Some(0) {
            return Err(ConfigError::Zero {
                field: "alert_timeout_secs",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn cluster_timeout(&self) -> Duration {
        Duration::from_secs(self.cluster_timeout_secs)
    }

    #[must_use]
    pub fn receiver(&self) -> ReceiverConfig {
        ReceiverConfig {
            max_workers: self.max_workers,
            queue_capacity: self.queue_capacity,
            alert_timeout: self.alert_timeout_secs.map(Duration::from_secs),
        }
    }
}
