//! Home Assistant sink error types.

use thiserror::Error;

pub type HassResult<T> = Result<T, HassError>;

/// Errors raised while setting up the MQTT connection. All are fatal at
/// startup; runtime publish failures surface as `SinkError` instead.
#[derive(Debug, Error)]
pub enum HassError {
    #[error("invalid mqtt uri: {0}")]
    InvalidUri(String),

    #[error("unsupported mqtt uri scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to connect to mqtt broker: {0}")]
    Connect(String),

    #[error("timed out connecting to mqtt broker after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("failed to encode discovery document: {0}")]
    Encode(#[from] serde_json::Error),
}
