mod api;
mod openai;
mod types;

pub use api::{AssistantApi, AssistantError, ListOrder, RunOptions};
pub use openai::OpenAiAssistants;
pub use types::{
    FunctionCall, MessageContent, RequiredAction, Run, RunError, RunStatus, SubmitToolOutputs,
    TextContent, Thread, ThreadMessage, ToolCall, ToolOutput,
};
