mod assistant;
mod config;
mod context;
mod error;
mod intake;
mod paths;
mod relay;
mod relay_config;
mod runner;
mod server;
mod tools;

pub use assistant::{
    AssistantApi, AssistantError, FunctionCall, ListOrder, MessageContent, OpenAiAssistants,
    RequiredAction, Run, RunError, RunOptions, RunStatus, SubmitToolOutputs, TextContent, Thread,
    ThreadMessage, ToolCall, ToolOutput,
};
pub use config::ServerConfig;
pub use context::{decorate, strip_context, PageContext};
pub use error::RelayError;
pub use intake::{FormIntake, GetformIntake, IntakeError};
pub use relay::{format_history, ChatRelay, RelaySettings};
pub use relay_config::{
    AssistantConfig, IntakeConfig, MessagesConfig, RelayConfig, ServiceKeyword, WidgetConfig,
};
pub use runner::{poll_run, PollSettings};
pub use server::build_router;
pub use tools::{ToolDispatcher, ToolError};
