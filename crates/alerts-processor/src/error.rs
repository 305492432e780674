//! Error types for the alert pipeline.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a cluster metadata lookup.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API request failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Lookup did not complete in time
    #[error("Cluster lookup timed out after {0:?}")]
    Timeout(Duration),

    /// Cluster could not be reached
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by an alerts repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backing store could not be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

/// A collaborator failure that aborted one alert's pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cluster lookup failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Persisting alert failed: {0}")]
    Repository(#[from] RepositoryError),

    /// Pipeline exceeded the per-alert time limit
    #[error("Pipeline timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned to callers submitting work to the receiver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Receiver has been shut down and accepts no new alerts
    #[error("Receiver is shutting down; {rejected} alert(s) not accepted")]
    ShuttingDown { rejected: usize },
}

/// Invalid service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}
