#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatrelay_core::{
    AssistantApi, AssistantError, ChatRelay, FormIntake, FunctionCall, IntakeError, ListOrder,
    MessageContent, PollSettings, RelaySettings, RequiredAction, Run, RunOptions, RunStatus,
    ServerConfig, SubmitToolOutputs, TextContent, Thread, ThreadMessage, ToolCall, ToolOutput,
};
use chatrelay_protocol::{ContactArgs, Role};
use futures::future::BoxFuture;
use tokio::net::TcpListener;

// ── Fake assistant provider ──────────────────────────────────────────

/// What the next `retrieve_run` reports.
#[derive(Debug, Clone)]
pub enum Step {
    Status(RunStatus),
    ToolCall { name: String, arguments: String },
}

impl Step {
    pub fn contact(arguments: &str) -> Self {
        Self::ToolCall {
            name: "create_contact".into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: Vec<Run>,
    script: VecDeque<Step>,
    reply: Option<String>,
    run_options: Vec<RunOptions>,
    tool_outputs: Vec<ToolOutput>,
    cancelled: Vec<String>,
    full_lists: usize,
    recent_lists: usize,
}

impl FakeState {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut Run, AssistantError> {
        self.runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or_else(|| not_found(run_id))
    }

    fn complete(&mut self, thread_id: &str, run_id: &str) {
        if let Some(reply) = self.reply.clone() {
            let id = self.next("msg");
            if let Some(messages) = self.threads.get_mut(thread_id) {
                messages.push(text_message(&id, Role::Assistant, Some(run_id), &reply));
            }
        }
    }
}

/// In-memory stand-in for the hosted thread/run API.
///
/// Runs start `queued`; each `retrieve_run` consumes one scripted step. An
/// exhausted script leaves the run where it is.
pub struct FakeAssistant {
    state: Mutex<FakeState>,
}

impl FakeAssistant {
    pub fn new(reply: Option<&str>, script: Vec<Step>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                script: script.into(),
                reply: reply.map(str::to_string),
                ..FakeState::default()
            }),
        }
    }

    pub fn completing(reply: &str) -> Self {
        Self::new(Some(reply), vec![Step::Status(RunStatus::Completed)])
    }

    /// Seed a thread with existing messages and, optionally, a prior run.
    pub fn with_thread(
        self,
        thread_id: &str,
        messages: Vec<ThreadMessage>,
        latest_run: Option<RunStatus>,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.threads.insert(thread_id.to_string(), messages);
            if let Some(status) = latest_run {
                let id = state.next("run");
                state.runs.push(run(&id, thread_id, status));
            }
        }
        self
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        let state = self.state.lock().unwrap();
        state.threads.get(thread_id).cloned().unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.state.lock().unwrap().threads.len()
    }

    pub fn run_options(&self) -> Vec<RunOptions> {
        self.state.lock().unwrap().run_options.clone()
    }

    pub fn tool_outputs(&self) -> Vec<ToolOutput> {
        self.state.lock().unwrap().tool_outputs.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Paginated and single-page list calls made so far.
    pub fn list_calls(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.full_lists, state.recent_lists)
    }
}

impl AssistantApi for FakeAssistant {
    fn create_thread(&self) -> BoxFuture<'_, Result<Thread, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let id = state.next("thread");
            state.threads.insert(id.clone(), Vec::new());
            Ok(Thread { id })
        })
    }

    fn create_message<'a>(
        &'a self,
        thread_id: &'a str,
        role: Role,
        content: &'a str,
    ) -> BoxFuture<'a, Result<ThreadMessage, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let id = state.next("msg");
            let message = text_message(&id, role, None, content);
            state
                .threads
                .get_mut(thread_id)
                .ok_or_else(|| not_found(thread_id))?
                .push(message.clone());
            Ok(message)
        })
    }

    fn list_messages<'a>(
        &'a self,
        thread_id: &'a str,
        order: ListOrder,
    ) -> BoxFuture<'a, Result<Vec<ThreadMessage>, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.full_lists += 1;
            let mut messages = state
                .threads
                .get(thread_id)
                .cloned()
                .ok_or_else(|| not_found(thread_id))?;
            if order == ListOrder::Desc {
                messages.reverse();
            }
            Ok(messages)
        })
    }

    fn recent_messages<'a>(
        &'a self,
        thread_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<ThreadMessage>, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.recent_lists += 1;
            let messages = state
                .threads
                .get(thread_id)
                .ok_or_else(|| not_found(thread_id))?;
            Ok(messages.iter().rev().take(limit as usize).cloned().collect())
        })
    }

    fn create_run<'a>(
        &'a self,
        thread_id: &'a str,
        options: &'a RunOptions,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if !state.threads.contains_key(thread_id) {
                return Err(not_found(thread_id));
            }
            let id = state.next("run");
            let created = run(&id, thread_id, RunStatus::Queued);
            state.runs.push(created.clone());
            state.run_options.push(options.clone());
            Ok(created)
        })
    }

    fn retrieve_run<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let step = state.script.pop_front();
            let current = state.run_mut(run_id)?;
            match step {
                Some(Step::Status(status)) => {
                    current.status = status;
                    current.required_action = None;
                }
                Some(Step::ToolCall { name, arguments }) => {
                    current.status = RunStatus::RequiresAction;
                    current.required_action = Some(RequiredAction {
                        kind: "submit_tool_outputs".into(),
                        submit_tool_outputs: Some(SubmitToolOutputs {
                            tool_calls: vec![ToolCall {
                                id: format!("call_{run_id}"),
                                kind: "function".into(),
                                function: FunctionCall { name, arguments },
                            }],
                        }),
                    });
                }
                None => {}
            }
            let snapshot = current.clone();
            if snapshot.status == RunStatus::Completed {
                state.complete(thread_id, run_id);
            }
            Ok(snapshot)
        })
    }

    fn submit_tool_outputs<'a>(
        &'a self,
        _thread_id: &'a str,
        run_id: &'a str,
        outputs: Vec<ToolOutput>,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.tool_outputs.extend(outputs);
            let current = state.run_mut(run_id)?;
            current.status = RunStatus::InProgress;
            current.required_action = None;
            Ok(current.clone())
        })
    }

    fn cancel_run<'a>(
        &'a self,
        _thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.cancelled.push(run_id.to_string());
            let current = state.run_mut(run_id)?;
            current.status = RunStatus::Cancelling;
            Ok(current.clone())
        })
    }

    fn latest_run<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Run>, AssistantError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state
                .runs
                .iter()
                .rev()
                .find(|run| run.thread_id == thread_id)
                .cloned())
        })
    }
}

fn not_found(id: &str) -> AssistantError {
    AssistantError::Status {
        status: 404,
        body: format!("No thread or run found with id '{id}'."),
    }
}

pub fn run(id: &str, thread_id: &str, status: RunStatus) -> Run {
    Run {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        assistant_id: Some("asst_test".to_string()),
        status,
        required_action: None,
        last_error: None,
    }
}

pub fn text_message(id: &str, role: Role, run_id: Option<&str>, value: &str) -> ThreadMessage {
    ThreadMessage {
        id: id.to_string(),
        role,
        run_id: run_id.map(str::to_string),
        content: vec![MessageContent::Text {
            text: TextContent {
                value: value.to_string(),
            },
        }],
    }
}

// ── Recording form intake ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingIntake {
    submitted: Mutex<Vec<ContactArgs>>,
    pub fail: bool,
}

impl RecordingIntake {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<ContactArgs> {
        self.submitted.lock().unwrap().clone()
    }
}

impl FormIntake for RecordingIntake {
    fn submit<'a>(&'a self, contact: &'a ContactArgs) -> BoxFuture<'a, Result<(), IntakeError>> {
        Box::pin(async move {
            if self.fail {
                return Err(IntakeError::Status(500));
            }
            self.submitted.lock().unwrap().push(contact.clone());
            Ok(())
        })
    }
}

// ── Relay / server helpers ───────────────────────────────────────────

pub fn fast_settings() -> RelaySettings {
    RelaySettings {
        default_assistant_id: Some("asst_default".into()),
        poll: PollSettings {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_secs(5)),
        },
        ..RelaySettings::default()
    }
}

pub fn relay(
    api: Arc<FakeAssistant>,
    intake: Arc<RecordingIntake>,
    settings: RelaySettings,
) -> ChatRelay {
    ChatRelay::new(api, intake, settings)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("CHATRELAY_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with_test_writer()
        .try_init();
}

pub async fn start_server(config: ServerConfig, relay: ChatRelay) -> SocketAddr {
    init_tracing();
    let app = chatrelay_core::build_router(config, relay);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
