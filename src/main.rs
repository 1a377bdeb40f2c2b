use axum::{Router, routing};
use simple_git_notify::error::RelayError;
use simple_git_notify::handlers::{handle_org_webhook, handle_repo_webhook, ping};
use simple_git_notify::{AppState, RelayConfig};
use std::fs;
use std::sync::Arc;
use tracing::{self, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
const DEFAULT_CONFIG_PATH: &str = "notify_config.toml";

/// Load and parse the configuration file
fn load_config(path: &str) -> Result<RelayConfig, RelayError> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: RelayConfig = toml::from_str(&config_str).map_err(|e| {
        RelayError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    Ok(config)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("NOTIFY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: RelayConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        config,
        http: reqwest::Client::new(),
    });

    tracing_subscriber::fmt::init();
    let app = Router::new()
        .route("/ping", routing::get(ping))
        .route("/webhook", routing::post(handle_repo_webhook))
        .route("/weborg", routing::post(handle_org_webhook))
        .with_state(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
