//! Extraction of the minimal alert field set from loosely structured labels.

use crate::models::{RawAlert, SanitizedAlert};

pub const DEFAULT_ALERT_NAME: &str = "unknown_alert";
pub const DEFAULT_SEVERITY: &str = "unknown";
pub const DEFAULT_DEPLOYMENT: &str = "unknown";
pub const DEFAULT_NAMESPACE: &str = "default";

/// Turns a raw alert into a [`SanitizedAlert`]. Must be total: every input
/// produces a value.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw: &RawAlert) -> SanitizedAlert;
}

/// Reads well-known labels and falls back to fixed defaults.
///
/// | field           | label(s)                           | default           |
/// |-----------------|------------------------------------|-------------------|
/// | alert_name      | `alertname`                        | `unknown_alert`   |
/// | severity        | `severity`                         | `unknown`         |
/// | deployment_name | `deployment`, then `deployment_name` | `unknown`       |
/// | namespace       | `namespace`                        | `default`         |
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSanitizer;

impl BasicSanitizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Sanitizer for BasicSanitizer {
    fn sanitize(&self, raw: &RawAlert) -> SanitizedAlert {
        let label = |key: &str| raw.labels.get(key).cloned();

        SanitizedAlert {
            alert_name: label("alertname").unwrap_or_else(|| DEFAULT_ALERT_NAME.to_string()),
            severity: label("severity").unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
            deployment_name: label("deployment")
                .or_else(|| label("deployment_name"))
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            namespace: label("namespace").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            timestamp: raw.starts_at,
        }
    }
}
