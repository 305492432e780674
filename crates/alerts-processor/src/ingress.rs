//! Alertmanager webhook wire format and its translation into pipeline input.
//!
//! Reference: <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
//!
//! The wire types are deliberately lenient: only the alert list matters, and
//! every per-alert field is optional. Defaults are applied in
//! [`WebhookAlert::into_raw`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{AlertmanagerPayload, RawAlert};

/// Alertmanager webhook payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Version of the payload format
    #[serde(default)]
    pub version: Option<String>,
    /// Unique identifier for this group of alerts
    #[serde(default)]
    pub group_key: Option<String>,
    /// Status: "firing" or "resolved"
    #[serde(default)]
    pub status: Option<String>,
    /// Receiver that matched this alert
    #[serde(default)]
    pub receiver: Option<String>,
    /// List of alerts in this notification
    #[serde(default)]
    pub alerts: Option<Vec<WebhookAlert>>,
}

/// Individual alert from Alertmanager.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAlert {
    /// Status: "firing" or "resolved"
    #[serde(default)]
    pub status: Option<String>,
    /// Alert labels
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    /// Alert annotations
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
    /// When the alert started firing (RFC 3339)
    #[serde(default)]
    pub starts_at: Option<String>,
    /// When the alert was resolved (RFC 3339)
    #[serde(default)]
    pub ends_at: Option<String>,
    /// URL to the alert in Alertmanager
    #[serde(default, rename = "generatorURL")]
    pub generator_url: Option<String>,
    /// Unique fingerprint for this alert
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl WebhookPayload {
    /// Translate into the batch the receiver fans out over.
    #[must_use]
    pub fn into_payload(self) -> AlertmanagerPayload {
        let now = Utc::now();
        AlertmanagerPayload::new(
            self.alerts
                .unwrap_or_default()
                .into_iter()
                .map(|alert| alert.into_raw(now))
                .collect(),
        )
    }
}

impl WebhookAlert {
    /// Build a [`RawAlert`], using `now` for any missing or unparseable
    /// timestamp. An absent or empty `endsAt` means the alert has no end time.
    #[must_use]
    pub fn into_raw(self, now: DateTime<Utc>) -> RawAlert {
        RawAlert {
            labels: self.labels.unwrap_or_default(),
            annotations: self.annotations.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| "firing".to_string()),
            starts_at: parse_timestamp(self.starts_at.as_deref()).unwrap_or(now),
            ends_at: self
                .ends_at
                .filter(|value| !value.is_empty())
                .map(|value| parse_timestamp(Some(&value)).unwrap_or(now)),
        }
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Offset-qualified values are normalized to UTC; values without an offset
/// are taken to be UTC already.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}
