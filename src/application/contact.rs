//! Contact form validation and relay.
//!
//! Submissions are validated server-side, then relayed to an external
//! form endpoint as a form-encoded POST. The endpoint is optional; an
//! unconfigured relay rejects submissions with a clear message instead
//! of silently dropping them.

use std::time::Duration;

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 1000;
pub const NAME_MIN_CHARS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Per-field validation messages, rendered next to the inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.message.is_none()
    }
}

impl ContactSubmission {
    /// Trim-then-check validation. All fields are checked so the form can
    /// show every problem at once.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.name.trim().chars().count() < NAME_MIN_CHARS {
            errors.name = Some(format!(
                "Name must be at least {NAME_MIN_CHARS} characters."
            ));
        }

        if !is_plausible_email(self.email.trim()) {
            errors.email = Some("Enter a valid email address.".to_string());
        }

        let message_len = self.message.trim().chars().count();
        if message_len < MESSAGE_MIN_CHARS {
            errors.message = Some(format!(
                "Message must be at least {MESSAGE_MIN_CHARS} characters."
            ));
        } else if message_len > MESSAGE_MAX_CHARS {
            errors.message = Some(format!(
                "Message must be at most {MESSAGE_MAX_CHARS} characters."
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `local@domain` with a dot somewhere in the domain and no whitespace or
/// second `@`. Deliverability is the relay's problem.
fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("contact relay endpoint is not configured")]
    NotConfigured,
    #[error("contact relay request failed")]
    Relay(#[from] reqwest::Error),
    #[error("contact relay rejected the submission: {message}")]
    Rejected { message: String },
}

#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: String,
}

pub struct ContactService {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl ContactService {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Relay a validated submission. The endpoint's JSON error body, when
    /// present, becomes the user-visible rejection message.
    pub async fn submit(&self, submission: &ContactSubmission) -> Result<(), ContactError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(ContactError::NotConfigured);
        };

        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("name", submission.name.trim()),
                ("email", submission.email.trim()),
                ("message", submission.message.trim()),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            info!(target = "brezza::contact", "contact submission relayed");
            return Ok(());
        }

        counter!("brezza_contact_relay_failure_total").increment(1);
        let status = response.status();
        let message = match response.json::<RelayErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "The message could not be sent. Please try again later.".to_string(),
        };
        warn!(
            target = "brezza::contact",
            status = status.as_u16(),
            message = %message,
            "contact relay rejected submission"
        );
        Err(ContactError::Rejected { message })
    }
}
