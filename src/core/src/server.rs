use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatrelay_protocol::{
    ChatRequest, ChatResponse, ErrorBody, HistoryQuery, HistoryResponse, ToolRequest, ToolResponse,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::relay::ChatRelay;
use crate::tools::ToolError;

/// Shared state accessible by handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub relay: Arc<ChatRelay>,
}

/// Build the axum router for the relay.
///
/// Exposes `/chat`, `/chat-history`, `/tools` and `/health`. Browser
/// callers are limited to `config.allowed_origins`.
pub fn build_router(config: ServerConfig, relay: ChatRelay) -> Router {
    tracing::debug!(
        origins = ?config.allowed_origins,
        poll_interval_ms = relay.settings().poll.interval.as_millis() as u64,
        "building router"
    );
    let state = AppState {
        relay: Arc::new(relay),
    };

    Router::new()
        .route("/chat", post(chat))
        .route("/chat-history", get(chat_history))
        .route("/tools", post(tools))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(%origin, error = %err, "ignoring invalid allowed origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}

/// JSON error reply. The body never carries upstream details.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(message),
        }
    }

    /// Client errors keep their message; upstream failures get `apology`.
    fn from_relay(err: &RelayError, apology: &str) -> Self {
        if err.is_client_error() {
            return Self::new(StatusCode::BAD_REQUEST, err.to_string());
        }
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, apology)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "rejected chat payload");
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;
    match state.relay.chat(request).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::error!(error = %err, "chat error");
            Err(ApiError::from_relay(
                &err,
                &state.relay.settings().messages.chat_error,
            ))
        }
    }
}

async fn chat_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    match state.relay.history(query.thread()).await {
        Ok(history) => Ok(Json(HistoryResponse { history })),
        Err(err) => {
            if !err.is_client_error() {
                tracing::error!(error = %err, "history error");
            }
            Err(ApiError::from_relay(
                &err,
                &state.relay.settings().messages.history_error,
            ))
        }
    }
}

async fn tools(
    State(state): State<AppState>,
    payload: Result<Json<ToolRequest>, JsonRejection>,
) -> (StatusCode, Json<ToolResponse>) {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ToolResponse::error(rejection.body_text())),
            )
        }
    };
    let tool = request.tool.clone();
    match state.relay.tools().invoke(request).await {
        Ok(response) => {
            tracing::info!(%tool, "tool invoked");
            (StatusCode::OK, Json(response))
        }
        Err(ToolError::Intake(err)) => {
            tracing::error!(%tool, error = %err, "tool intake failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ToolResponse::error("Failed to submit contact.")),
            )
        }
        Err(err) => {
            tracing::warn!(%tool, error = %err, "tool request rejected");
            (StatusCode::BAD_REQUEST, Json(ToolResponse::error(err.to_string())))
        }
    }
}
