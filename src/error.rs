use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Rejected before any state change (bad id, unknown direction, unknown item on write).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    pub fn validation(message: impl Into<String>) -> Self {
        DiscoveryError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DiscoveryError::Validation(_))
    }
}

impl From<sqlx::Error> for DiscoveryError {
    fn from(e: sqlx::Error) -> Self {
        DiscoveryError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(e: serde_json::Error) -> Self {
        DiscoveryError::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for DiscoveryError {
    fn from(e: config::ConfigError) -> Self {
        DiscoveryError::Config(e.to_string())
    }
}

impl From<std::io::Error> for DiscoveryError {
    fn from(e: std::io::Error) -> Self {
        DiscoveryError::Storage(e.to_string())
    }
}
