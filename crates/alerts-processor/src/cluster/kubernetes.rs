//! Kubernetes-backed cluster client.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Namespace;
use kube::Api;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::ClusterClient;
use crate::error::ClusterError;
use crate::models::DeploymentInfo;

/// Default time limit for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cluster client that queries the Kubernetes API.
///
/// `kube::Client` is cheap to clone and safe to share, so one instance serves
/// every worker.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: kube::Client,
    timeout: Duration,
}

impl KubeClusterClient {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: kube::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Connect using the ambient kubeconfig or in-cluster service account.
    pub async fn try_default(timeout: Duration) -> Result<Self, ClusterError> {
        let client = kube::Client::try_default().await?;
        Ok(Self::new(client, timeout))
    }

    async fn bounded<T, F>(&self, request: F) -> Result<T, ClusterError>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ClusterError::Timeout(self.timeout))?
            .map_err(ClusterError::from)
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, ClusterError> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        self.bounded(deployments.get_opt(name)).await
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let found = self.bounded(namespaces.get_opt(namespace)).await?;
        Ok(found.is_some())
    }

    async fn deployment_exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        Ok(self.get_deployment(namespace, name).await?.is_some())
    }

    async fn get_deployment_info(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentInfo, ClusterError> {
        match self.get_deployment(namespace, name).await? {
            Some(deployment) => Ok(deployment_info(&deployment)),
            None => {
                // Invalid alerts are enriched too; report an empty snapshot
                debug!(namespace, deployment = name, "Deployment not found, using placeholder");
                Ok(DeploymentInfo::default())
            }
        }
    }
}

/// Extract replica counts and the first container image from a deployment.
pub fn deployment_info(deployment: &Deployment) -> DeploymentInfo {
    let status = deployment.status.as_ref();
    let image = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.first())
        .and_then(|container| container.image.clone())
        .unwrap_or_default();

    DeploymentInfo {
        replicas: status.and_then(|s| s.replicas).unwrap_or(0),
        available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
        updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};

    #[test]
    fn test_deployment_info_reads_status_and_image() {
        let deployment = Deployment {
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![
                            Container {
                                name: "api".to_string(),
                                image: Some("ghcr.io/acme/api:1.4.2".to_string()),
                                ..Default::default()
                            },
                            Container {
                                name: "proxy".to_string(),
                                image: Some("envoy:1.30".to_string()),
                                ..Default::default()
                            },
                        ],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                replicas: Some(4),
                available_replicas: Some(3),
                updated_replicas: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };

        let info = deployment_info(&deployment);
        assert_eq!(info.replicas, 4);
        assert_eq!(info.available_replicas, 3);
        assert_eq!(info.updated_replicas, 2);
        assert_eq!(info.image, "ghcr.io/acme/api:1.4.2");
    }

    #[test]
    fn test_deployment_info_defaults_when_unset() {
        let info = deployment_info(&Deployment::default());
        assert_eq!(info, DeploymentInfo::default());
    }
}
