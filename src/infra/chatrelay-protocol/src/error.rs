use thiserror::Error;

/// Errors raised while validating payloads that cross the widget contract.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}
