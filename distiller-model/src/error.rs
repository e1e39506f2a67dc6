use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
