use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Arguments of the `create_contact` tool, forwarded verbatim to form intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactArgs {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Any additional fields the assistant supplied.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawContact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ContactArgs {
    /// Parse the JSON-encoded argument string of a tool call.
    pub fn parse(arguments: &str) -> Result<Self, ProtocolError> {
        let raw: RawContact = serde_json::from_str(arguments)?;
        Self::from_raw(raw)
    }

    /// Validate an already-decoded JSON value (the `POST /tools` path).
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let raw: RawContact = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawContact) -> Result<Self, ProtocolError> {
        let name = required(raw.name, "name")?;
        let email = required(raw.email, "email")?;
        let message = required(raw.message, "message")?;
        if !is_valid_email(&email) {
            return Err(ProtocolError::InvalidEmail(email));
        }
        Ok(Self {
            name,
            email,
            message,
            source: raw
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            extra: raw.extra,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ProtocolError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ProtocolError::MissingField(field))
}

/// Minimal address check: one `@`, a non-empty local part, and a dotted
/// domain with no empty labels.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
