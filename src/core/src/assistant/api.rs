use chatrelay_protocol::Role;
use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use super::types::{Run, Thread, ThreadMessage, ToolOutput};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Asc,
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Parameters for starting a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
}

/// Object-safe view of the hosted thread/run/message lifecycle.
///
/// The provider owns all state; implementations only translate calls.
pub trait AssistantApi: Send + Sync + 'static {
    fn create_thread(&self) -> BoxFuture<'_, Result<Thread, AssistantError>>;

    fn create_message<'a>(
        &'a self,
        thread_id: &'a str,
        role: Role,
        content: &'a str,
    ) -> BoxFuture<'a, Result<ThreadMessage, AssistantError>>;

    fn list_messages<'a>(
        &'a self,
        thread_id: &'a str,
        order: ListOrder,
    ) -> BoxFuture<'a, Result<Vec<ThreadMessage>, AssistantError>>;

    /// Single page of the newest messages, newest first.
    fn recent_messages<'a>(
        &'a self,
        thread_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<ThreadMessage>, AssistantError>>;

    fn create_run<'a>(
        &'a self,
        thread_id: &'a str,
        options: &'a RunOptions,
    ) -> BoxFuture<'a, Result<Run, AssistantError>>;

    fn retrieve_run<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>>;

    fn submit_tool_outputs<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
        outputs: Vec<ToolOutput>,
    ) -> BoxFuture<'a, Result<Run, AssistantError>>;

    fn cancel_run<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>>;

    /// Most recently created run on the thread, if any.
    fn latest_run<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Run>, AssistantError>>;
}
