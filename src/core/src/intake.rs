use std::time::Duration;

use chatrelay_protocol::ContactArgs;
use futures::future::BoxFuture;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("form intake url is not configured")]
    NotConfigured,

    #[error("invalid form intake url: {0}")]
    InvalidUrl(String),

    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("form intake returned status {0}")]
    Status(u16),
}

/// The form URL carries the account token; it is dropped from the error.
impl From<reqwest::Error> for IntakeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// Destination for contact submissions collected by the assistant.
pub trait FormIntake: Send + Sync + 'static {
    fn submit<'a>(&'a self, contact: &'a ContactArgs) -> BoxFuture<'a, Result<(), IntakeError>>;
}

/// Posts contacts as JSON to a hosted Getform endpoint.
#[derive(Debug, Clone)]
pub struct GetformIntake {
    client: reqwest::Client,
    url: Option<Url>,
}

impl GetformIntake {
    /// `url` of `None` (or blank) builds an intake that rejects every
    /// submission, so the assistant is told the contact was not saved.
    pub fn new(url: Option<&str>, timeout: Duration) -> Result<Self, IntakeError> {
        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(
                Url::parse(raw).map_err(|e| IntakeError::InvalidUrl(format!("{raw}: {e}")))?,
            ),
            None => None,
        };
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

impl FormIntake for GetformIntake {
    fn submit<'a>(&'a self, contact: &'a ContactArgs) -> BoxFuture<'a, Result<(), IntakeError>> {
        Box::pin(async move {
            let url = self.url.clone().ok_or(IntakeError::NotConfigured)?;
            let response = self
                .client
                .post(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(contact)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(IntakeError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}
