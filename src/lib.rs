pub mod dispatch;
pub mod embed;
pub mod error;
pub mod handlers;
pub mod utils;

use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub repo_route: RouteConfig,
    pub org_route: RouteConfig,
}

/// Secret/sink pair for a single webhook route.
#[derive(Debug, Deserialize, Clone)]
pub struct RouteConfig {
    pub webhook_secret: String,
    pub sink_url: String,
}

impl RouteConfig {
    /// Returns true if a valid (non-empty) webhook_secret is set.
    pub fn has_valid_secret(&self) -> bool {
        !self.webhook_secret.is_empty()
    }
}

pub struct AppState {
    pub config: RelayConfig,
    pub http: reqwest::Client,
}

pub type SharedState = Arc<AppState>;
