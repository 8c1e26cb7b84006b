use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::MailConfig;

/// Port on which SMTP speaks TLS from the first byte instead of upgrading
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email server not configured")]
    NotConfigured,
    #[error("invalid address {0}")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

/// A notification for the site owner
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    /// Display name for the From header; the address is always the relay account
    pub sender_name: String,
    /// Where replies should go, usually the visitor
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP relay authenticated with the configured account
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Address,
    to: Mailbox,
}

impl SmtpMailer {
    /// `Err(NotConfigured)` unless host, user, password and recipient are all set
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let (Some(host), Some(user), Some(password), Some(to)) = (
            config.host.as_deref(),
            config.user.as_deref(),
            config.password.as_deref(),
            config.to.as_deref(),
        ) else {
            return Err(MailError::NotConfigured);
        };

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|err| MailError::Transport(err.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();

        let from: Address = user
            .parse()
            .map_err(|_| MailError::Address(user.to_string()))?;
        let to: Mailbox = to.parse().map_err(|_| MailError::Address(to.to_string()))?;
        debug!("SMTP relay via {}:{}", host, config.port);
        Ok(Self { transport, from, to })
    }

    fn message(&self, email: OutgoingEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(Mailbox::new(Some(email.sender_name), self.from.clone()))
            .to(self.to.clone())
            .subject(email.subject);
        if let Some(reply_to) = email.reply_to.as_deref() {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|_| MailError::Address(reply_to.to_string()))?;
            builder = builder.reply_to(reply_to);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|err| MailError::Build(err.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let subject = email.subject.clone();
        let message = self.message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;
        info!("📧 Sent '{}' to {}", subject, self.to);
        Ok(())
    }
}

/// Used when email is switched off: the message only reaches the log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(
            subject = %email.subject,
            reply_to = email.reply_to.as_deref().unwrap_or("-"),
            "Email disabled, logging message instead:\n{}",
            email.text
        );
        Ok(())
    }
}

/// Keeps every message in memory; optionally fails every send
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(host: Option<&str>, port: u16) -> MailConfig {
        MailConfig {
            enabled: true,
            host: host.map(str::to_string),
            port,
            user: Some("relay@example.com".to_string()),
            password: Some("secret".to_string()),
            to: Some("Owner <owner@example.com>".to_string()),
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            sender_name: "Asha".to_string(),
            reply_to: Some("asha@example.com".to_string()),
            subject: "[Website Contact] Viewing".to_string(),
            text: "Hello there".to_string(),
            html: "<p>Hello there</p>".to_string(),
        }
    }

    #[test]
    fn incomplete_settings_are_not_configured() {
        assert!(matches!(
            SmtpMailer::from_config(&mail_config(None, 587)),
            Err(MailError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn builds_message_with_reply_to() {
        let mailer = SmtpMailer::from_config(&mail_config(Some("smtp.example.com"), 465)).unwrap();
        let message = mailer.message(email()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Reply-To: asha@example.com"));
        assert!(raw.contains("From: Asha <relay@example.com>"));
        assert!(raw.contains("Subject: [Website Contact] Viewing"));
    }

    #[tokio::test]
    async fn bad_reply_to_is_rejected() {
        let mailer = SmtpMailer::from_config(&mail_config(Some("smtp.example.com"), 587)).unwrap();
        let mut bad = email();
        bad.reply_to = Some("not an address".to_string());
        assert!(matches!(mailer.message(bad), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn recorder_keeps_messages() {
        let recorder = RecordingMailer::new();
        recorder.send(email()).await.unwrap();
        assert_eq!(recorder.sent().await.len(), 1);
        assert!(RecordingMailer::failing().send(email()).await.is_err());
    }
}
