use std::time::Duration;

use chatrelay_protocol::Role;
use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::api::{AssistantApi, AssistantError, ListOrder, RunOptions};
use super::types::{Run, Thread, ThreadMessage, ToolOutput};

const ASSISTANTS_BETA: &str = "assistants=v2";
const PAGE_LIMIT: &str = "100";
const MAX_PAGES: usize = 10;
const ERROR_BODY_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

/// REST client for the OpenAI Assistants v2 API.
#[derive(Debug, Clone)]
pub struct OpenAiAssistants {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiAssistants {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AssistantError> {
        let trimmed = base_url.trim();
        let base_url = Url::parse(trimmed)
            .map_err(|e| AssistantError::InvalidUrl(format!("{trimmed}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AssistantError::InvalidUrl(trimmed.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Segments are percent-encoded, so opaque ids from the browser cannot
    /// escape the thread path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header("OpenAI-Beta", ASSISTANTS_BETA);
        if !self.api_key.trim().is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        request
    }

    async fn send<T: DeserializeOwned>(
        &self,
        what: &'static str,
        request: RequestBuilder,
    ) -> Result<T, AssistantError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::debug!(%status, what, "assistant api request failed");
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, ERROR_BODY_MAX_CHARS),
            });
        }
        serde_json::from_str(&body).map_err(|source| AssistantError::Decode { what, source })
    }
}

impl AssistantApi for OpenAiAssistants {
    fn create_thread(&self) -> BoxFuture<'_, Result<Thread, AssistantError>> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.endpoint(&["threads"]))
                .json(&json!({}));
            self.send("thread", request).await
        })
    }

    fn create_message<'a>(
        &'a self,
        thread_id: &'a str,
        role: Role,
        content: &'a str,
    ) -> BoxFuture<'a, Result<ThreadMessage, AssistantError>> {
        Box::pin(async move {
            let request = self
                .request(
                    Method::POST,
                    self.endpoint(&["threads", thread_id, "messages"]),
                )
                .json(&json!({ "role": role, "content": content }));
            self.send("message", request).await
        })
    }

    fn list_messages<'a>(
        &'a self,
        thread_id: &'a str,
        order: ListOrder,
    ) -> BoxFuture<'a, Result<Vec<ThreadMessage>, AssistantError>> {
        Box::pin(async move {
            let mut messages = Vec::new();
            let mut after: Option<String> = None;
            for _ in 0..MAX_PAGES {
                let mut request = self
                    .request(
                        Method::GET,
                        self.endpoint(&["threads", thread_id, "messages"]),
                    )
                    .query(&[("order", order.as_str()), ("limit", PAGE_LIMIT)]);
                if let Some(cursor) = after.as_deref() {
                    request = request.query(&[("after", cursor)]);
                }
                let page: Page<ThreadMessage> = self.send("message list", request).await?;
                messages.extend(page.data);
                match (page.has_more, page.last_id) {
                    (true, Some(last)) => after = Some(last),
                    _ => break,
                }
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
            let limit = limit.to_string();
            let request = self
                .request(
                    Method::GET,
                    self.endpoint(&["threads", thread_id, "messages"]),
                )
                .query(&[("order", ListOrder::Desc.as_str()), ("limit", limit.as_str())]);
            let page: Page<ThreadMessage> = self.send("message list", request).await?;
            Ok(page.data)
        })
    }

    fn create_run<'a>(
        &'a self,
        thread_id: &'a str,
        options: &'a RunOptions,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.endpoint(&["threads", thread_id, "runs"]))
                .json(options);
            self.send("run", request).await
        })
    }

    fn retrieve_run<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let request = self.request(
                Method::GET,
                self.endpoint(&["threads", thread_id, "runs", run_id]),
            );
            self.send("run", request).await
        })
    }

    fn submit_tool_outputs<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
        outputs: Vec<ToolOutput>,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let request = self
                .request(
                    Method::POST,
                    self.endpoint(&["threads", thread_id, "runs", run_id, "submit_tool_outputs"]),
                )
                .json(&json!({ "tool_outputs": outputs }));
            self.send("run", request).await
        })
    }

    fn cancel_run<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, Result<Run, AssistantError>> {
        Box::pin(async move {
            let request = self.request(
                Method::POST,
                self.endpoint(&["threads", thread_id, "runs", run_id, "cancel"]),
            );
            self.send("run", request).await
        })
    }

    fn latest_run<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Run>, AssistantError>> {
        Box::pin(async move {
            let request = self
                .request(Method::GET, self.endpoint(&["threads", thread_id, "runs"]))
                .query(&[("order", "desc"), ("limit", "1")]);
            let page: Page<Run> = self.send("run list", request).await?;
            Ok(page.data.into_iter().next())
        })
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &value[..idx]),
        None => value.to_string(),
    }
}
