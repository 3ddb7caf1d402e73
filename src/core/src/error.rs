use thiserror::Error;

use crate::assistant::{AssistantError, RunStatus};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("threadId is required")]
    MissingThreadId,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("assistant api: {0}")]
    Assistant(#[from] AssistantError),

    #[error("run ended with status: {status}")]
    RunNotCompleted { status: RunStatus },

    #[error("run timed out with status: {status}")]
    RunTimedOut { status: RunStatus },
}

impl RelayError {
    /// The caller sent something unusable; everything else is upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingThreadId | Self::BadRequest(_))
    }
}
