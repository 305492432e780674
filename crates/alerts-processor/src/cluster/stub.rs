//! Placeholder cluster client for running without cluster access.

use async_trait::async_trait;
use tracing::debug;

use super::ClusterClient;
use crate::error::ClusterError;
use crate::models::DeploymentInfo;

/// Image reported for every deployment.
pub const STUB_IMAGE: &str = "registry.example.com/app:latest";

/// Replica count reported for every deployment.
pub const STUB_REPLICAS: i32 = 3;

/// Cluster client that reports every namespace and deployment as present.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubClusterClient;

impl StubClusterClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClusterClient for StubClusterClient {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, ClusterError> {
        debug!(namespace, "Stub namespace lookup");
        Ok(true)
    }

    async fn deployment_exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        debug!(namespace, deployment = name, "Stub deployment lookup");
        Ok(true)
    }

    async fn get_deployment_info(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentInfo, ClusterError> {
        debug!(namespace, deployment = name, "Stub deployment info");
        Ok(DeploymentInfo {
            replicas: STUB_REPLICAS,
            available_replicas: STUB_REPLICAS,
            updated_replicas: STUB_REPLICAS,
            image: STUB_IMAGE.to_string(),
        })
    }
}
