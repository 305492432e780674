//! Alertmanager alert ingestion pipeline.
//!
//! Alerts pushed by Alertmanager's webhook are fanned out onto a bounded
//! worker pool, and each one runs through a fixed pipeline:
//!
//! ```text
//! webhook batch -> AlertsReceiver -> [worker] -> sanitize -> validate -> enrich -> persist
//! ```
//!
//! # Architecture
//!
//! Every pipeline role is a trait so implementations can be swapped without
//! touching the pipeline:
//!
//! - [`Sanitizer`] extracts a defaulted field set from raw labels
//! - [`Validator`] checks the referenced namespace and deployment exist
//! - [`Enricher`] attaches live deployment status
//! - [`AlertsRepository`] stores the terminal record
//! - [`ClusterClient`] answers the cluster queries used by the two above
//!
//! [`AlertsService`] wires one object graph together at startup and is
//! handed to the HTTP layer; there is no global state.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use alerts_processor::{AlertsService, InMemoryRepository, ReceiverConfig, StubClusterClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let service = AlertsService::new(
//!     Arc::new(StubClusterClient::new()),
//!     Arc::new(InMemoryRepository::new()),
//!     &ReceiverConfig::default(),
//! );
//! alerts_processor::server::run_server(service.clone(), "0.0.0.0:8080", async {}).await?;
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cluster;
pub mod config;
pub mod enricher;
pub mod error;
pub mod ingress;
pub mod models;
pub mod processor;
pub mod receiver;
pub mod repository;
pub mod sanitizer;
pub mod server;
pub mod validator;

pub use cluster::{ClusterClient, KubeClusterClient, StubClusterClient};
pub use config::{ClusterBackend, Config, LogFormat};
pub use enricher::{ClusterEnricher, Enricher};
pub use error::{ClusterError, ConfigError, PipelineError, ReceiverError, RepositoryError};
pub use models::{
    AlertStatus, AlertmanagerPayload, DeploymentInfo, EnrichedAlert, ProcessedAlert, RawAlert,
    SanitizedAlert, ValidatedAlert,
};
pub use processor::{AlertProcessor, Pipeline};
pub use receiver::{AlertsReceiver, ReceiverConfig, StatsSnapshot};
pub use repository::{AlertsRepository, InMemoryRepository};
pub use sanitizer::{BasicSanitizer, Sanitizer};
pub use validator::{ClusterValidator, Validator};

use std::sync::Arc;

/// The assembled service: one pipeline, one receiver, one repository.
///
/// Cheap to clone; clones share the same receiver and repository.
#[derive(Clone)]
pub struct AlertsService {
    receiver: Arc<AlertsReceiver>,
    repository: Arc<dyn AlertsRepository>,
}

impl AlertsService {
    /// Wire the default stage implementations around `cluster` and
    /// `repository` and start the worker pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        repository: Arc<dyn AlertsRepository>,
        config: &ReceiverConfig,
    ) -> Self {
        let pipeline = Pipeline::new(
            Arc::new(BasicSanitizer::new()),
            Arc::new(ClusterValidator::new(Arc::clone(&cluster))),
            Arc::new(ClusterEnricher::new(cluster)),
            Arc::clone(&repository),
        );
        Self::with_processor(Arc::new(pipeline), repository, config)
    }

    /// Build around a custom processor.
    pub fn with_processor(
        processor: Arc<dyn AlertProcessor>,
        repository: Arc<dyn AlertsRepository>,
        config: &ReceiverConfig,
    ) -> Self {
        Self {
            receiver: Arc::new(AlertsReceiver::new(processor, config)),
            repository,
        }
    }

    #[must_use]
    pub fn receiver(&self) -> &AlertsReceiver {
        &self.receiver
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<dyn AlertsRepository> {
        &self.repository
    }

    /// Stop accepting alerts and wait for all submitted work to finish.
    pub async fn shutdown(&self) -> StatsSnapshot {
        self.receiver.shutdown(true).await;
        self.receiver.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn labelled(pairs: &[(&str, &str)]) -> RawAlert {
        RawAlert::firing(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    /// Push `alerts` alerts through a pool of `workers` and return how many
    /// records the repository holds after a waiting shutdown.
    async fn persisted_after_shutdown(alerts: usize, workers: usize) -> usize {
        let repository = Arc::new(InMemoryRepository::new());
        let service = AlertsService::new(
            Arc::new(StubClusterClient::new()),
            repository.clone(),
            &ReceiverConfig::with_workers(workers),
        );

        let batch = (0..alerts)
            .map(|i| {
                let name = format!("Alert{i}");
                labelled(&[
                    ("alertname", name.as_str()),
                    ("namespace", "payments"),
                    ("deployment", "api"),
                ])
            })
            .collect();
        service
            .receiver()
            .handle_webhook(AlertmanagerPayload::new(batch))
            .await
            .unwrap();

        let stats = service.shutdown().await;
        assert_eq!(stats.processed, alerts as u64);

        let stored = repository.all().await.unwrap();
        assert!(stored.iter().all(|a| a.status == AlertStatus::Processed));
        stored.len()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fewer_alerts_than_workers_are_all_persisted() {
        assert_eq!(persisted_after_shutdown(3, 8).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_as_many_alerts_as_workers_are_all_persisted() {
        assert_eq!(persisted_after_shutdown(8, 8).await, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_more_alerts_than_workers_are_all_persisted() {
        assert_eq!(persisted_after_shutdown(25, 4).await, 25);
    }
}
