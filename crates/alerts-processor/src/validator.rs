//! Confirms that the resources an alert refers to exist in the cluster.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::error::ClusterError;
use crate::models::{SanitizedAlert, ValidatedAlert};

#[async_trait]
pub trait Validator: Send + Sync {
    /// Produce a validation verdict. A missing resource is a normal
    /// `is_valid = false` outcome; only lookup failures are errors.
    async fn validate(&self, alert: &SanitizedAlert) -> Result<ValidatedAlert, ClusterError>;
}

/// Checks namespace, then deployment, against a [`ClusterClient`].
pub struct ClusterValidator {
    cluster: Arc<dyn ClusterClient>,
}

impl ClusterValidator {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Validator for ClusterValidator {
    async fn validate(&self, alert: &SanitizedAlert) -> Result<ValidatedAlert, ClusterError> {
        if !self.cluster.namespace_exists(&alert.namespace).await? {
            debug!(namespace = %alert.namespace, "Namespace not found");
            return Ok(ValidatedAlert::invalid(
                alert,
                format!("Namespace '{}' not found", alert.namespace),
            ));
        }

        if !self
            .cluster
            .deployment_exists(&alert.namespace, &alert.deployment_name)
            .await?
        {
            debug!(
                namespace = %alert.namespace,
                deployment = %alert.deployment_name,
                "Deployment not found"
            );
            return Ok(ValidatedAlert::invalid(
                alert,
                format!("Deployment '{}' not found", alert.deployment_name),
            ));
        }

        Ok(ValidatedAlert::valid(alert))
    }
}
