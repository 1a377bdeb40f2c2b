use std::io;

/// Custom error type for simple_git_notify operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to render notification document: {0}")]
    FormatFailed(#[from] serde_json::Error),

    #[error("Dispatch to Discord sink failed: {0}")]
    DispatchFailed(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
