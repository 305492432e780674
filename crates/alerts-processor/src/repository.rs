//! Storage of terminal alert records.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RepositoryError;
use crate::models::ProcessedAlert;

/// Store of [`ProcessedAlert`] records.
///
/// `save` must tolerate any number of concurrent callers without losing
/// writes, and `all` must return a point-in-time snapshot. A networked
/// implementation is expected to bound its own I/O with a timeout.
#[async_trait]
pub trait AlertsRepository: Send + Sync {
    async fn save(&self, alert: ProcessedAlert) -> Result<(), RepositoryError>;

    /// All records in insertion order. The returned vector is owned by the
    /// caller and is unaffected by later saves.
    async fn all(&self) -> Result<Vec<ProcessedAlert>, RepositoryError>;
}

/// Repository kept in process memory. Swap for a SQL/NoSQL store as needed.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    items: RwLock<Vec<ProcessedAlert>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl AlertsRepository for InMemoryRepository {
    async fn save(&self, alert: ProcessedAlert) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        debug!(alert_id = %alert.alert_id, status = %alert.status, "Saving alert");
        items.push(alert);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ProcessedAlert>, RepositoryError> {
        Ok(self.items.read().await.clone())
    }
}
