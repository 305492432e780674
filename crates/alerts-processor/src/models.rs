//! Alert representations produced by each pipeline stage.
//!
//! Every stage consumes a reference to the previous representation and
//! returns a new value; nothing here is mutated after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// One alert from an inbound webhook batch, after wire translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    /// Alert labels
    pub labels: HashMap<String, String>,
    /// Alert annotations
    pub annotations: HashMap<String, String>,
    /// Status: "firing" or "resolved"
    pub status: String,
    /// When the alert started firing
    pub starts_at: DateTime<Utc>,
    /// When the alert was resolved (if resolved)
    pub ends_at: Option<DateTime<Utc>>,
}

impl RawAlert {
    /// Create a firing alert with the given labels, starting now.
    #[must_use]
    pub fn firing(labels: HashMap<String, String>) -> Self {
        Self {
            labels,
            annotations: HashMap::new(),
            status: "firing".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
        }
    }

    /// The `alertname` label, if any. Used for log context only.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.labels.get("alertname").map(String::as_str)
    }
}

/// The minimal, defaulted field set extracted from a [`RawAlert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedAlert {
    pub alert_name: String,
    pub severity: String,
    pub deployment_name: String,
    pub namespace: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of checking that the resources an alert refers to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedAlert {
    pub is_valid: bool,
    /// Populated only when `is_valid` is false
    pub reason: Option<String>,
    pub deployment_name: String,
    pub namespace: String,
    pub alert_name: String,
    pub severity: String,
}

impl ValidatedAlert {
    /// A passing validation result for `alert`.
    #[must_use]
    pub fn valid(alert: &SanitizedAlert) -> Self {
        Self {
            is_valid: true,
            reason: None,
            deployment_name: alert.deployment_name.clone(),
            namespace: alert.namespace.clone(),
            alert_name: alert.alert_name.clone(),
            severity: alert.severity.clone(),
        }
    }

    /// A failing validation result for `alert` with the given reason.
    #[must_use]
    pub fn invalid(alert: &SanitizedAlert, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            ..Self::valid(alert)
        }
    }
}

/// Snapshot of a deployment's state at lookup time. Never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub image: String,
}

/// A validated alert with live deployment metadata attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedAlert {
    /// An enrichment lookup was made and returned without error
    pub cluster_verified: bool,
    pub deployment_info: DeploymentInfo,
    pub alert_name: String,
    pub severity: String,
}

/// Terminal status of a persisted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Referenced resources exist
    Processed,
    /// Validation failed; persisted for auditing
    Invalid,
}

impl AlertStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of record in the repository. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedAlert {
    pub alert_id: Uuid,
    pub status: AlertStatus,
    pub payload: EnrichedAlert,
    pub received_at: DateTime<Utc>,
}

impl ProcessedAlert {
    /// Wrap an enriched alert into a record with a fresh id, stamped now.
    #[must_use]
    pub fn new(status: AlertStatus, payload: EnrichedAlert) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            status,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// An inbound batch; the unit the receiver fans out over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertmanagerPayload {
    pub alerts: Vec<RawAlert>,
}

impl AlertmanagerPayload {
    #[must_use]
    pub fn new(alerts: Vec<RawAlert>) -> Self {
        Self { alerts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
