use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Token signing error: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    #[error("Super-Facility API error: {0}")]
    SfApi(String),

    #[error("Record store rejected request: {status}: {message}")]
    RecordStore {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid DM4 file: {0}")]
    InvalidDm4(String),
}

impl CoreError {
    /// Whether a retry with backoff may succeed. Deterministic failures
    /// (protocol errors, invariant violations, bad files) are not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Http(_) => true,
            CoreError::RecordStore { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
