use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::paths::chatrelay_config_path;

pub const DEFAULT_FALLBACK_REPLY: &str = "I'm sorry, I couldn't formulate a response.";
pub const DEFAULT_BUSY_REPLY: &str =
    "I'm still working on your previous message. Please wait a moment and try again.";
pub const DEFAULT_CHAT_ERROR: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again in a moment.";
pub const DEFAULT_HISTORY_ERROR: &str = "Failed to fetch history.";

/// File-backed settings read from `~/.chatrelay/config.toml`.
///
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub assistant: AssistantConfig,
    pub intake: IntakeConfig,
    pub widget: WidgetConfig,
    pub messages: MessagesConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            intake: IntakeConfig::default(),
            widget: WidgetConfig::default(),
            messages: MessagesConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, String> {
        let path = chatrelay_config_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw =
            std::fs::read_to_string(path).map_err(|e| format!("read config.toml: {e}"))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| format!("parse config.toml: {e}"))
    }

    pub fn config_path() -> Result<PathBuf, String> {
        chatrelay_config_path()
    }

    /// Load the config file, falling back to defaults when it is unreadable.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                let path = Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "~/.chatrelay/config.toml".to_string());
                tracing::warn!(%path, error = %err, "failed to load relay config; using defaults");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    /// Used when the widget does not send an `assistantId`.
    pub default_assistant_id: Option<String>,
    /// Extra instructions attached to every run.
    pub instructions: Option<String>,
    /// Refuse new messages while the thread still has an active run.
    pub busy_guard: bool,
    pub request_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            default_assistant_id: None,
            instructions: None,
            busy_guard: true,
            request_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub allowed_origins: Vec<String>,
    pub service_keywords: Vec<ServiceKeyword>,
}

/// Maps a substring of the page path or title to a service name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceKeyword {
    pub keyword: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub fallback: String,
    pub busy: String,
    pub chat_error: String,
    pub history_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_FALLBACK_REPLY.to_string(),
            busy: DEFAULT_BUSY_REPLY.to_string(),
            chat_error: DEFAULT_CHAT_ERROR.to_string(),
            history_error: DEFAULT_HISTORY_ERROR.to_string(),
        }
    }
}
