use std::sync::Arc;

use chatrelay_protocol::{ChatRequest, ChatResponse, HistoryEntry, Role};
use tracing::Instrument;
use uuid::Uuid;

use crate::assistant::{AssistantApi, ListOrder, RunOptions, ThreadMessage};
use crate::config::ServerConfig;
use crate::context::{decorate, strip_context, PageContext};
use crate::error::RelayError;
use crate::intake::FormIntake;
use crate::relay_config::{MessagesConfig, RelayConfig, ServiceKeyword};
use crate::runner::{poll_run, PollSettings};
use crate::tools::ToolDispatcher;

/// The run's reply is among the newest messages on the thread.
const REPLY_LOOKUP_LIMIT: u32 = 20;

/// Behaviour knobs for [`ChatRelay`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub default_assistant_id: Option<String>,
    pub instructions: Option<String>,
    pub busy_guard: bool,
    pub service_keywords: Vec<ServiceKeyword>,
    pub messages: MessagesConfig,
    pub poll: PollSettings,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default(), &RelayConfig::default())
    }
}

impl RelaySettings {
    pub fn from_config(server: &ServerConfig, relay: &RelayConfig) -> Self {
        Self {
            default_assistant_id: non_empty(relay.assistant.default_assistant_id.as_deref()),
            instructions: non_empty(relay.assistant.instructions.as_deref()),
            busy_guard: relay.assistant.busy_guard,
            service_keywords: relay.widget.service_keywords.clone(),
            messages: relay.messages.clone(),
            poll: PollSettings {
                interval: server.poll_interval,
                timeout: server.run_timeout,
            },
        }
    }
}

/// Forwards widget messages into provider threads and reads them back.
#[derive(Clone)]
pub struct ChatRelay {
    api: Arc<dyn AssistantApi>,
    tools: ToolDispatcher,
    settings: RelaySettings,
}

impl ChatRelay {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        intake: Arc<dyn FormIntake>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            api,
            tools: ToolDispatcher::new(intake),
            settings,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolDispatcher {
        &self.tools
    }

    /// Send one user message and wait for the assistant's reply.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RelayError> {
        let span = tracing::info_span!("chat", request_id = %Uuid::new_v4());
        self.chat_inner(request).instrument(span).await
    }

    async fn chat_inner(&self, request: ChatRequest) -> Result<ChatResponse, RelayError> {
        let user_message = request.user_message.as_str();
        if user_message.trim().is_empty() {
            return Err(RelayError::BadRequest("userMessage is required".into()));
        }
        let assistant_id = request
            .requested_assistant()
            .map(str::to_string)
            .or_else(|| self.settings.default_assistant_id.clone())
            .ok_or_else(|| RelayError::BadRequest("assistantId is required".into()))?;

        let thread_id = match request.existing_thread() {
            Some(existing) => {
                let existing = existing.to_string();
                if self.settings.busy_guard && self.thread_is_busy(&existing).await? {
                    tracing::info!(thread_id = %existing, "thread has an active run; asking user to wait");
                    return Ok(ChatResponse {
                        response: self.settings.messages.busy.clone(),
                        thread_id: existing,
                    });
                }
                existing
            }
            None => {
                let thread = self.api.create_thread().await?;
                tracing::info!(thread_id = %thread.id, "created thread");
                thread.id
            }
        };

        let context = PageContext::from_request(&request)
            .infer_service(&self.settings.service_keywords);
        let content = decorate(user_message, &context);
        self.api
            .create_message(&thread_id, Role::User, &content)
            .await?;

        let options = RunOptions {
            assistant_id,
            additional_instructions: self.settings.instructions.clone(),
        };
        let run = self.api.create_run(&thread_id, &options).await?;
        tracing::debug!(%thread_id, run_id = %run.id, status = %run.status, "run started");

        let run = poll_run(
            self.api.as_ref(),
            &self.tools,
            &thread_id,
            run,
            &self.settings.poll,
        )
        .await?;

        let messages = self
            .api
            .recent_messages(&thread_id, REPLY_LOOKUP_LIMIT)
            .await?;
        let response = assistant_reply(&messages, &run.id)
            .map(str::to_string)
            .unwrap_or_else(|| {
                tracing::warn!(%thread_id, run_id = %run.id, "no assistant reply for run; using fallback");
                self.settings.messages.fallback.clone()
            });

        Ok(ChatResponse {
            response,
            thread_id,
        })
    }

    /// Conversation so far, oldest first, with page context removed.
    pub async fn history(&self, thread_id: Option<&str>) -> Result<Vec<HistoryEntry>, RelayError> {
        let thread_id = thread_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(RelayError::MissingThreadId)?;
        let messages = self.api.list_messages(thread_id, ListOrder::Asc).await?;
        Ok(format_history(&messages))
    }

    async fn thread_is_busy(&self, thread_id: &str) -> Result<bool, RelayError> {
        let latest = self.api.latest_run(thread_id).await?;
        Ok(latest.is_some_and(|run| run.status.is_active()))
    }
}

/// Reply written by `run_id`, searching newest first.
fn assistant_reply<'a>(messages: &'a [ThreadMessage], run_id: &str) -> Option<&'a str> {
    messages
        .iter()
        .find(|m| m.role == Role::Assistant && m.run_id.as_deref() == Some(run_id))
        .and_then(ThreadMessage::first_text)
        .filter(|text| !text.is_empty())
}

/// Keep text messages in order; strip page context from user turns only.
pub fn format_history(messages: &[ThreadMessage]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .filter_map(|message| {
            let text = message.first_text()?;
            let content = match message.role {
                Role::User => strip_context(text),
                Role::Assistant | Role::System => text.to_string(),
            };
            Some(HistoryEntry {
                role: message.role,
                content,
            })
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
