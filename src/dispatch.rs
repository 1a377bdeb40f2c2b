//! Delivery of formatted notifications to the Discord sink.

use reqwest::Client;
use serde_json::Value;
use tracing::{self, error, info, warn};

use crate::embed::{DiscordMessage, fallback_message, simplified_message};

/// Conservative ceiling on the serialized message; Discord's real limit is
/// higher, but anything near it is not worth sending in full.
pub const MAX_MESSAGE_BYTES: usize = 6_000_000;

/// Terminal state of one delivery attempt, used to pick the HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    DeliveredSimplified,
    DeliveredFallback,
    Failed,
}

/// Posts the message to the sink.
///
/// Oversized messages are swapped for a two-field summary before the first
/// attempt. A failed POST gets exactly one fallback attempt with a minimal
/// error-indicator message; if that fails too the outcome is `Failed`.
pub async fn dispatch(
    client: &Client,
    sink_url: &str,
    event: &str,
    payload: &Value,
    message: DiscordMessage,
) -> DispatchOutcome {
    let (message, simplified) = match serde_json::to_vec(&message) {
        Ok(bytes) if bytes.len() > MAX_MESSAGE_BYTES => {
            warn!(
                "Message for {} event is {} bytes, too large for Discord webhook",
                event,
                bytes.len()
            );
            (simplified_message(event, payload), true)
        }
        Ok(_) => (message, false),
        Err(e) => {
            error!("Could not serialize {} message: {}", event, e);
            (simplified_message(event, payload), true)
        }
    };

    match post_message(client, sink_url, &message).await {
        Ok(()) => {
            if simplified {
                info!("Sent simplified {} notification to Discord due to payload size", event);
                DispatchOutcome::DeliveredSimplified
            } else {
                info!("Successfully sent {} notification to Discord", event);
                DispatchOutcome::Delivered
            }
        }
        Err(primary_error) => {
            error!("Discord API error for {} event: {}", event, primary_error);
            match post_message(client, sink_url, &fallback_message(event)).await {
                Ok(()) => {
                    info!("Sent fallback notification for {} after initial error", event);
                    DispatchOutcome::DeliveredFallback
                }
                Err(fallback_error) => {
                    error!("Failed to send fallback message: {}", fallback_error);
                    DispatchOutcome::Failed
                }
            }
        }
    }
}

async fn post_message(
    client: &Client,
    sink_url: &str,
    message: &DiscordMessage,
) -> crate::error::Result<()> {
    client
        .post(sink_url)
        .json(message)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
