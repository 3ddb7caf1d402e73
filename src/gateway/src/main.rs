use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chatrelay_core::{
    build_router, ChatRelay, GetformIntake, OpenAiAssistants, RelayConfig, RelaySettings,
    ServerConfig,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_filter())
        .init();

    let defaults = ServerConfig::default();
    let mut relay_config = RelayConfig::load_or_default();

    let bind = parse_bind(defaults.bind);
    let poll_interval = parse_millis("CHATRELAY_POLL_MS", defaults.poll_interval);
    let run_timeout = parse_timeout("CHATRELAY_RUN_TIMEOUT_SECS", defaults.run_timeout);
    let allowed_origins = parse_list("CHATRELAY_ALLOWED_ORIGINS")
        .unwrap_or_else(|| relay_config.widget.allowed_origins.clone());

    if let Some(url) = parse_string("OPENAI_BASE_URL") {
        relay_config.assistant.base_url = url;
    }
    if let Some(id) = parse_string("CHATRELAY_ASSISTANT_ID") {
        relay_config.assistant.default_assistant_id = Some(id);
    }
    if let Some(url) = parse_string("GETFORM_URL") {
        relay_config.intake.url = Some(url);
    }

    let config = ServerConfig {
        bind,
        poll_interval,
        run_timeout,
        allowed_origins,
    };

    let api_key = parse_string("OPENAI_API_KEY").unwrap_or_else(|| {
        tracing::warn!("OPENAI_API_KEY is not set; assistant requests will be rejected");
        String::new()
    });
    let api = OpenAiAssistants::new(
        &relay_config.assistant.base_url,
        api_key,
        Duration::from_secs(relay_config.assistant.request_timeout_secs),
    )?;
    let intake = GetformIntake::new(
        relay_config.intake.url.as_deref(),
        Duration::from_secs(relay_config.intake.timeout_secs),
    )?;
    if !intake.is_configured() {
        tracing::warn!("GETFORM_URL is not set; create_contact calls will fail");
    }

    let settings = RelaySettings::from_config(&config, &relay_config);
    let relay = ChatRelay::new(Arc::new(api), Arc::new(intake), settings);
    let app = build_router(config.clone(), relay);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        run_timeout_secs = ?config.run_timeout.map(|t| t.as_secs()),
        "listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// `CHATRELAY_BIND` wins; a bare `PORT` (as set by most hosts) binds all
/// interfaces.
fn parse_bind(default: SocketAddr) -> SocketAddr {
    if let Ok(v) = env::var("CHATRELAY_BIND") {
        return v.parse().unwrap_or(default);
    }
    match env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()) {
        Some(port) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        None => default,
    }
}

fn parse_millis(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(default),
        Err(_) => default,
    }
}

/// `0` disables the timeout.
fn parse_timeout(key: &str, default: Option<Duration>) -> Option<Duration> {
    match env::var(key) {
        Ok(v) => match v.parse::<u64>() {
            Ok(0) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => default,
        },
        Err(_) => default,
    }
}

fn parse_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    Some(
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn parse_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn tracing_filter() -> tracing_subscriber::EnvFilter {
    let explicit = env::var("CHATRELAY_LOG").or_else(|_| env::var("RUST_LOG")).ok();
    if let Some(filter) = explicit {
        return tracing_subscriber::EnvFilter::new(filter);
    }
    if matches!(
        env::var("CHATRELAY_DEBUG").as_deref(),
        Ok("1" | "true" | "TRUE" | "yes" | "YES")
    ) {
        return tracing_subscriber::EnvFilter::new("debug");
    }
    tracing_subscriber::EnvFilter::new("info")
}
