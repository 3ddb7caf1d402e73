//! Page-context marker appended to user messages.
//!
//! The widget tells us which page the visitor is on. That information is
//! appended to the message text as a single `[CONTEXT: ...]` line so the
//! assistant can see it, and removed again when history is read back.

use std::borrow::Cow;
use std::sync::OnceLock;

use chatrelay_protocol::ChatRequest;
use regex::Regex;

use crate::relay_config::ServiceKeyword;

const MARKER_PREFIX: &str = "[CONTEXT:";

fn context_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?s)\n\[CONTEXT:.*?\]").expect("context marker pattern is valid")
    })
}

/// Where the visitor was when they sent a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub current_page: Option<String>,
    pub full_url: Option<String>,
    pub page_title: Option<String>,
    pub service_name: Option<String>,
}

impl PageContext {
    pub fn from_request(req: &ChatRequest) -> Self {
        Self {
            current_page: clean(req.current_page.as_deref()),
            full_url: clean(req.full_url.as_deref()),
            page_title: clean(req.page_title.as_deref()),
            service_name: clean(req.service_name.as_deref()),
        }
    }

    /// Fill in `service_name` from the first keyword found in the page path
    /// or title. An explicit service name is never overwritten.
    pub fn infer_service(mut self, keywords: &[ServiceKeyword]) -> Self {
        if self.service_name.is_some() {
            return self;
        }
        let haystack = [self.current_page.as_deref(), self.page_title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect::<Vec<_>>();
        self.service_name = keywords
            .iter()
            .find(|entry| {
                let needle = entry.keyword.trim().to_lowercase();
                !needle.is_empty() && haystack.iter().any(|h| h.contains(&needle))
            })
            .map(|entry| entry.service.clone());
        self
    }

    fn marker(&self) -> String {
        let mut marker = format!(
            "{MARKER_PREFIX} On page {}",
            self.current_page.as_deref().unwrap_or("")
        );
        for (label, value) in [
            ("URL", &self.full_url),
            ("Title", &self.page_title),
            ("Service", &self.service_name),
        ] {
            if let Some(value) = value {
                marker.push_str("; ");
                marker.push_str(label);
                marker.push_str(": ");
                marker.push_str(value);
            }
        }
        marker.push(']');
        marker
    }
}

/// Append the page-context marker to a user message.
pub fn decorate(message: &str, ctx: &PageContext) -> String {
    format!("{message}\n{}", ctx.marker())
}

/// Remove every page-context marker and trim the result.
///
/// Applied until nothing matches, so a marker spliced together by an
/// earlier removal is also caught and the function stays idempotent.
pub fn strip_context(text: &str) -> String {
    let re = context_marker();
    let mut current = Cow::Borrowed(text);
    loop {
        let next = match re.replace_all(&current, "") {
            Cow::Borrowed(_) => break,
            Cow::Owned(next) => next,
        };
        current = Cow::Owned(next);
    }
    current.trim().to_string()
}

/// Values go inside `[...]`, so brackets and line breaks are flattened.
fn clean(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
