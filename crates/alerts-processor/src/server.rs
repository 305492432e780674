//! HTTP server for Alertmanager webhooks.
//!
//! Provides REST API endpoints for:
//! - Receiving Alertmanager webhook batches
//! - Listing persisted alert records
//! - Receiver counters and health checks

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::ingress::WebhookPayload;
use crate::receiver::StatsSnapshot;
use crate::AlertsService;

/// Build the HTTP router.
pub fn build_router(service: AlertsService) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/alertmanager/webhook", post(webhook_handler))
        .route("/alerts", get(alerts_handler))
        .route("/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serve until `shutdown` resolves, then stop accepting connections.
///
/// Draining the receiver is left to the caller so it can happen after the
/// last in-flight request has been answered.
pub async fn run_server<F>(service: AlertsService, addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Alerts processor listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
struct AcceptedResponse {
    status: &'static str,
    alerts: usize,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept a webhook batch. The response only confirms submission; each
/// alert's outcome is recorded later by the pool.
async fn webhook_handler(
    State(service): State<AlertsService>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected malformed webhook payload");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid payload: {}", rejection.body_text()),
            );
        }
    };

    let batch = payload.into_payload();
    info!(alerts = batch.len(), "Received Alertmanager webhook");

    match service.receiver().handle_webhook(batch).await {
        Ok(alerts) => (
            StatusCode::OK,
            Json(AcceptedResponse {
                status: "accepted",
                alerts,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

async fn alerts_handler(State(service): State<AlertsService>) -> Response {
    match service.repository().all().await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list alerts");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn stats_handler(State(service): State<AlertsService>) -> Json<StatsSnapshot> {
    Json(service.receiver().stats())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "status": "error", "error": message }))).into_response()
}
