//! The per-alert pipeline: sanitize, validate, enrich, persist.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::enricher::Enricher;
use crate::error::PipelineError;
use crate::models::{AlertStatus, ProcessedAlert, RawAlert};
use crate::repository::AlertsRepository;
use crate::sanitizer::Sanitizer;
use crate::validator::Validator;

/// Turns one raw alert into exactly one persisted record.
#[async_trait]
pub trait AlertProcessor: Send + Sync {
    /// Run the alert through the pipeline and return what was persisted.
    ///
    /// Collaborator failures are returned as-is; nothing is persisted for an
    /// alert whose run fails.
    async fn process(&self, raw: RawAlert) -> Result<ProcessedAlert, PipelineError>;
}

/// Linear pipeline over the four stage interfaces.
///
/// Alerts that fail validation are still enriched and saved, with status
/// [`AlertStatus::Invalid`], so the audit trail shows the deployment context
/// around the failure.
pub struct Pipeline {
    sanitizer: Arc<dyn Sanitizer>,
    validator: Arc<dyn Validator>,
    enricher: Arc<dyn Enricher>,
    repository: Arc<dyn AlertsRepository>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        sanitizer: Arc<dyn Sanitizer>,
        validator: Arc<dyn Validator>,
        enricher: Arc<dyn Enricher>,
        repository: Arc<dyn AlertsRepository>,
    ) -> Self {
        Self {
            sanitizer,
            validator,
            enricher,
            repository,
        }
    }
}

#[async_trait]
impl AlertProcessor for Pipeline {
    async fn process(&self, raw: RawAlert) -> Result<ProcessedAlert, PipelineError> {
        let sanitized = self.sanitizer.sanitize(&raw);
        let validated = self.validator.validate(&sanitized).await?;

        let status = if validated.is_valid {
            AlertStatus::Processed
        } else {
            info!(
                alert = %validated.alert_name,
                namespace = %validated.namespace,
                deployment = %validated.deployment_name,
                reason = validated.reason.as_deref().unwrap_or_default(),
                "Alert failed validation, recording as invalid"
            );
            AlertStatus::Invalid
        };

        let enriched = self.enricher.enrich(&validated).await?;
        let processed = ProcessedAlert::new(status, enriched);
        self.repository.save(processed.clone()).await?;

        debug!(
            alert_id = %processed.alert_id,
            alert = %processed.payload.alert_name,
            status = %processed.status,
            "Alert persisted"
        );
        Ok(processed)
    }
}
