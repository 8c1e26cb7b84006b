//! Visitor enquiries: the contact form and callback requests.
//!
//! Submissions are validated, turned into a notification and handed to the
//! configured [`Mailer`]. Nothing is stored.

pub mod mailer;
pub mod rate_limit;

use std::sync::Arc;

use maud::html;
use thiserror::Error;
use tracing::{error, info};

use crate::config::MailConfig;
use crate::models::{CallbackRequest, ContactSubmission};

pub use mailer::{LogMailer, MailError, Mailer, OutgoingEmail, RecordingMailer, SmtpMailer};
pub use rate_limit::{Decision, RateLimiter};

pub const MIN_MESSAGE_LEN: usize = 10;
const MIN_PHONE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Valid email is required")]
    InvalidEmail,
    #[error("Subject is required")]
    SubjectRequired,
    #[error("Message must be at least 10 characters")]
    MessageTooShort,
    #[error("Please enter your name")]
    CallbackNameRequired,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
}

/// One `@`, a non-empty local part, a dotted domain with non-empty labels, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

impl ContactSubmission {
    /// Rules are checked in form order; the first failure is reported
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::SubjectRequired);
        }
        if self.message.trim().chars().count() < MIN_MESSAGE_LEN {
            return Err(ValidationError::MessageTooShort);
        }
        Ok(())
    }

    fn to_email(&self) -> OutgoingEmail {
        let name = self.name.trim();
        let email = self.email.trim();
        let subject = self.subject.trim();
        let message = self.message.trim();
        let html = html! {
            p { strong { "From: " } (name) " <" (email) ">" }
            p { strong { "Subject: " } (subject) }
            hr;
            div {
                @for (i, line) in message.lines().enumerate() {
                    @if i > 0 { br; }
                    (line)
                }
            }
        };
        OutgoingEmail {
            sender_name: name.to_string(),
            reply_to: Some(email.to_string()),
            subject: format!("[Website Contact] {}", subject),
            text: format!("{}\n\nFrom: {} <{}>", message, name, email),
            html: html.into_string(),
        }
    }
}

impl CallbackRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::CallbackNameRequired);
        }
        if self.phone.trim().chars().count() < MIN_PHONE_LEN {
            return Err(ValidationError::InvalidPhone);
        }
        Ok(())
    }

    fn to_email(&self) -> OutgoingEmail {
        let name = self.name.trim();
        let phone = self.phone.trim();
        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let html = html! {
            p { strong { "Name: " } (name) }
            p { strong { "Phone: " } (phone) }
            @if let Some(notes) = notes {
                p { strong { "Notes: " } (notes) }
            }
        };
        OutgoingEmail {
            sender_name: name.to_string(),
            reply_to: None,
            subject: format!("[Website Callback] {}", name),
            text: format!(
                "Callback requested by {} ({}).\n\n{}",
                name,
                phone,
                notes.unwrap_or("No notes.")
            ),
            html: html.into_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LeadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Email server not configured")]
    NotConfigured,
    #[error("Failed to send message")]
    SendFailed(#[source] MailError),
}

#[derive(Clone)]
enum Delivery {
    /// Email switched off: log and report success
    Disabled(Arc<dyn Mailer>),
    /// Switched on but the SMTP settings are incomplete
    Unconfigured,
    Ready(Arc<dyn Mailer>),
}

/// Validates enquiries and relays them to the site owner
#[derive(Clone)]
pub struct LeadRelay {
    delivery: Delivery,
}

impl LeadRelay {
    pub fn from_config(config: &MailConfig) -> Self {
        let delivery = if !config.enabled {
            info!("📭 Email disabled; enquiries will only be logged");
            Delivery::Disabled(Arc::new(LogMailer))
        } else {
            match SmtpMailer::from_config(config) {
                Ok(mailer) => Delivery::Ready(Arc::new(mailer)),
                Err(MailError::NotConfigured) => Delivery::Unconfigured,
                Err(err) => {
                    error!("SMTP relay unusable: {}", err);
                    Delivery::Unconfigured
                }
            }
        };
        Self { delivery }
    }

    /// Relay through an explicit mailer
    pub fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            delivery: Delivery::Ready(mailer),
        }
    }

    pub fn disabled() -> Self {
        Self {
            delivery: Delivery::Disabled(Arc::new(LogMailer)),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            delivery: Delivery::Unconfigured,
        }
    }

    pub async fn send_contact(&self, submission: &ContactSubmission) -> Result<(), LeadError> {
        submission.validate()?;
        self.deliver(submission.to_email()).await
    }

    pub async fn send_callback(&self, request: &CallbackRequest) -> Result<(), LeadError> {
        request.validate()?;
        self.deliver(request.to_email()).await
    }

    async fn deliver(&self, email: OutgoingEmail) -> Result<(), LeadError> {
        match &self.delivery {
            Delivery::Disabled(logger) => {
                // the log mailer cannot fail; a failure here is only logged
                if let Err(err) = logger.send(email).await {
                    error!("Logging disabled email failed: {}", err);
                }
                Ok(())
            }
            Delivery::Unconfigured => {
                error!("Enquiry dropped: SMTP_HOST, SMTP_USER, SMTP_PASS and CONTACT_TO_EMAIL are required");
                Err(LeadError::NotConfigured)
            }
            Delivery::Ready(mailer) => mailer.send(email).await.map_err(|err| {
                error!("Failed to relay enquiry: {}", err);
                LeadError::SendFailed(err)
            }),
        }
    }
}
