use thiserror::Error;

/// Errors raised while setting up or running the net meter
#[derive(Error, Debug)]
pub enum NetMeterError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source entity could not be read at setup time
    #[error("Setup failed: {0}")]
    AuthFailed(String),

    /// A poll cycle could not obtain a valid numeric reading
    #[error("Source {entity_id} not ready: {reason}")]
    NotReady { entity_id: String, reason: String },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Home Assistant rejected the access token")]
    Unauthorized,

    #[error("Home Assistant API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No HA connection")]
    NoConnection,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetMeterError {
    pub fn not_ready(entity_id: &str, reason: impl Into<String>) -> Self {
        Self::NotReady {
            entity_id: entity_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

pub type NetMeterResult<T> = Result<T, NetMeterError>;
