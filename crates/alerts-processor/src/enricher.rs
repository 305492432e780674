//! Attaches live deployment status to validated alerts.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::error::ClusterError;
use crate::models::{EnrichedAlert, ValidatedAlert};

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, alert: &ValidatedAlert) -> Result<EnrichedAlert, ClusterError>;
}

/// Looks up [`crate::models::DeploymentInfo`] for the alert's deployment.
///
/// The lookup happens whether or not the alert passed validation, so the
/// audit record of an invalid alert still shows what the cluster reported.
/// `cluster_verified` means the lookup returned, not that the deployment exists.
pub struct ClusterEnricher {
    cluster: Arc<dyn ClusterClient>,
}

impl ClusterEnricher {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Enricher for ClusterEnricher {
    async fn enrich(&self, alert: &ValidatedAlert) -> Result<EnrichedAlert, ClusterError> {
        let deployment_info = self
            .cluster
            .get_deployment_info(&alert.namespace, &alert.deployment_name)
            .await?;

        debug!(
            namespace = %alert.namespace,
            deployment = %alert.deployment_name,
            replicas = deployment_info.replicas,
            available = deployment_info.available_replicas,
            "Fetched deployment info"
        );

        Ok(EnrichedAlert {
            cluster_verified: true,
            deployment_info,
            alert_name: alert.alert_name.clone(),
            severity: alert.severity.clone(),
        })
    }
}
