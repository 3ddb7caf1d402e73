use std::time::Duration;

use tokio::time::Instant;

use crate::assistant::{AssistantApi, Run, RunStatus};
use crate::error::RelayError;
use crate::tools::ToolDispatcher;

/// How the relay waits on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits until the provider reaches a terminal state.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

enum Exit {
    Finished,
    TimedOut,
    Stalled,
}

/// Poll `run` until it completes, answering tool calls along the way.
///
/// Anything other than `completed` is an error. A run left non-terminal
/// (timeout, or a tool request we cannot answer) is cancelled first.
pub async fn poll_run(
    api: &dyn AssistantApi,
    tools: &ToolDispatcher,
    thread_id: &str,
    mut run: Run,
    settings: &PollSettings,
) -> Result<Run, RelayError> {
    let started = Instant::now();
    let exit = loop {
        if run.status.is_terminal() {
            break Exit::Finished;
        }
        if settings
            .timeout
            .is_some_and(|timeout| started.elapsed() >= timeout)
        {
            break Exit::TimedOut;
        }
        if run.status == RunStatus::RequiresAction {
            let outputs = tools.dispatch(run.tool_calls()).await;
            if outputs.is_empty() {
                // Nothing we can submit; the run would sit here forever.
                break Exit::Stalled;
            }
            tracing::debug!(
                %thread_id,
                run_id = %run.id,
                count = outputs.len(),
                "submitting tool outputs"
            );
            run = api.submit_tool_outputs(thread_id, &run.id, outputs).await?;
            if run.status.is_terminal() {
                break Exit::Finished;
            }
        }
        tokio::time::sleep(settings.interval).await;
        run = api.retrieve_run(thread_id, &run.id).await?;
        tracing::trace!(%thread_id, run_id = %run.id, status = %run.status, "run polled");
    };

    if run.status == RunStatus::Completed {
        return Ok(run);
    }

    if !run.status.is_terminal() {
        if let Err(err) = api.cancel_run(thread_id, &run.id).await {
            tracing::warn!(%thread_id, run_id = %run.id, error = %err, "failed to cancel run");
        }
    }

    if let Some(last_error) = run.last_error.as_ref() {
        tracing::warn!(
            %thread_id,
            run_id = %run.id,
            code = %last_error.code,
            message = %last_error.message,
            "run reported an error"
        );
    }

    match exit {
        Exit::TimedOut => Err(RelayError::RunTimedOut { status: run.status }),
        Exit::Finished | Exit::Stalled => Err(RelayError::RunNotCompleted { status: run.status }),
    }
}
