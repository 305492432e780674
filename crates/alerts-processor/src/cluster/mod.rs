//! Cluster metadata lookups.
//!
//! The pipeline only talks to the cluster through [`ClusterClient`]. Two
//! backends are provided:
//!
//! - [`StubClusterClient`] answers every query affirmatively with fixed numbers
//! - [`KubeClusterClient`] queries the Kubernetes API with a per-request timeout
//!
//! Implementations must be safe to call concurrently from any number of
//! pipeline runs; the pipeline does no locking of its own around them.

pub mod kubernetes;
pub mod stub;

use async_trait::async_trait;

use crate::error::ClusterError;
use crate::models::DeploymentInfo;

pub use kubernetes::KubeClusterClient;
pub use stub::StubClusterClient;

/// Existence and status queries about cluster-managed workloads.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Check whether a namespace exists.
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, ClusterError>;

    /// Check whether a deployment exists within a namespace.
    async fn deployment_exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError>;

    /// Fetch the current state of a deployment.
    async fn get_deployment_info(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentInfo, ClusterError>;
}
