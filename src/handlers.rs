use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use tracing::{self, error, info};

use crate::dispatch::{DispatchOutcome, dispatch};
use crate::embed::format_message;
use crate::utils::verify_github_signature;
use crate::{RouteConfig, SharedState};

/// Liveness endpoint for testing the webhook connection.
pub async fn ping() -> &'static str {
    "Webhook is active and connected!"
}

/// Handles GitHub repository webhook POST requests.
pub async fn handle_repo_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    process_webhook(&state, &state.config.repo_route, &headers, &body).await
}

/// Handles GitHub organization webhook POST requests.
pub async fn handle_org_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    process_webhook(&state, &state.config.org_route, &headers, &body).await
}

/// Shared verify → format → dispatch pipeline for both webhook routes.
async fn process_webhook(
    state: &SharedState,
    route: &RouteConfig,
    headers: &HeaderMap,
    body: &Bytes,
) -> (StatusCode, &'static str) {
    let event = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if !route.has_valid_secret() {
        error!("Webhook secret required for this route, but none was configured.");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook secret not configured",
        );
    }

    let signature_opt = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    let Some(signature) = signature_opt else {
        error!("No signature header supplied for {} event", event);
        return (StatusCode::UNAUTHORIZED, "Missing signature header");
    };

    // Verify over the exact bytes received; parsing happens afterwards.
    if !verify_github_signature(&route.webhook_secret, body, signature) {
        error!("Signature verification failed for {} event!", event);
        return (StatusCode::UNAUTHORIZED, "Signature verification failed");
    }

    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    info!("Received GitHub webhook: {}", event);
    let message = format_message(event, &payload);

    match dispatch(&state.http, &route.sink_url, event, &payload, message).await {
        DispatchOutcome::Delivered => (StatusCode::OK, "Webhook notification sent to Discord"),
        DispatchOutcome::DeliveredSimplified => (
            StatusCode::OK,
            "Simplified webhook notification sent to Discord",
        ),
        DispatchOutcome::DeliveredFallback => (
            StatusCode::OK,
            "Fallback webhook notification sent to Discord",
        ),
        DispatchOutcome::Failed => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process webhook"),
    }
}
