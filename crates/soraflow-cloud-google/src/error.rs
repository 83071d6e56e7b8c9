//! Google Cloud provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoogleError {
    #[error("gcloud not found. Please install the Google Cloud SDK")]
    GcloudNotFound,

    #[error("gcloud authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("gcloud command failed: {0}")]
    CommandFailed(String),

    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("Required attribute missing: {0}")]
    MissingAttribute(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GoogleError>;
