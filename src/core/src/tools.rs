use std::sync::Arc;

use chatrelay_protocol::{ContactArgs, ProtocolError, ToolRequest, ToolResponse, CREATE_CONTACT};
use serde_json::json;
use thiserror::Error;

use crate::assistant::{ToolCall, ToolOutput};
use crate::intake::{FormIntake, IntakeError};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] ProtocolError),

    #[error("intake failed: {0}")]
    Intake(#[from] IntakeError),
}

impl ToolError {
    /// Text safe to hand back to the assistant. Intake failures stay opaque.
    fn assistant_message(&self) -> String {
        match self {
            Self::Intake(_) => "could not save contact".to_string(),
            other => other.to_string(),
        }
    }
}

/// Executes the tool calls a run is waiting on.
#[derive(Clone)]
pub struct ToolDispatcher {
    intake: Arc<dyn FormIntake>,
}

impl ToolDispatcher {
    pub fn new(intake: Arc<dyn FormIntake>) -> Self {
        Self { intake }
    }

    /// Run every recognised call and collect its output.
    ///
    /// Unrecognised function names produce no output. Failures never escape:
    /// they are reported to the assistant as `{"status":"error"}`.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::new();
        for call in calls {
            if call.function.name != CREATE_CONTACT {
                tracing::warn!(tool = %call.function.name, call_id = %call.id, "ignoring unknown tool call");
                continue;
            }
            let output = match self.create_contact_from_str(&call.function.arguments).await {
                Ok(()) => {
                    tracing::info!(call_id = %call.id, "contact forwarded to form intake");
                    json!({ "status": "ok" })
                }
                Err(err) => {
                    tracing::warn!(call_id = %call.id, error = %err, "create_contact failed");
                    json!({ "status": "error", "message": err.assistant_message() })
                }
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output: output.to_string(),
            });
        }
        outputs
    }

    /// Direct invocation from `POST /tools`.
    pub async fn invoke(&self, request: ToolRequest) -> Result<ToolResponse, ToolError> {
        if request.tool != CREATE_CONTACT {
            return Err(ToolError::UnknownTool(request.tool));
        }
        let contact = ContactArgs::from_value(request.args)?;
        self.intake.submit(&contact).await?;
        Ok(ToolResponse::success(format!(
            "Thanks {}, your message has been sent.",
            contact.name
        )))
    }

    async fn create_contact_from_str(&self, arguments: &str) -> Result<(), ToolError> {
        let contact = ContactArgs::parse(arguments)?;
        self.intake.submit(&contact).await?;
        Ok(())
    }
}
