//! Error types for Likesweep

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LikesweepError>;

#[derive(Error, Debug)]
pub enum LikesweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LikesweepError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            LikesweepError::Config(_) => 2,
            LikesweepError::InvalidInput(_) => 2,
            LikesweepError::Api(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to load env file: {0}")]
    EnvFile(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Errors raised while talking to the likes API.
///
/// Only [`ApiError::Request`] and [`ApiError::Network`] are ever produced by a
/// delete call; the sweep treats those as per-item failures.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
