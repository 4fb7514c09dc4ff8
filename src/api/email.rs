//! Outbound email: message templates and delivery backends.
//!
//! Handlers never fail because of email. The OTP email is awaited so the
//! response can report that delivery was attempted; the welcome email is
//! spawned and forgotten. Both log failures and move on.
//!
//! The default sender for local dev is `LogEmailSender`, which logs the
//! recipient and template but never the body (it carries the passcode).
//! `SmtpEmailSender` delivers through an SMTP relay with STARTTLS.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{error, info};

const PRODUCT_NAME: &str = "HD Notes";

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub template: &'static str,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Email delivery abstraction.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error describing why it failed.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    from: String,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: String, from: String) -> Self {
        Self {
            host,
            port: 587,
            username: None,
            password: None,
            from,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }
}

/// SMTP sender backed by a pooled lettre transport.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build the transport. No connection is opened until the first send.
    ///
    /// # Errors
    /// Returns an error if the relay host or the sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from()
            .parse::<Mailbox>()
            .with_context(|| format!("invalid sender address: {}", config.from()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.host())
            .with_context(|| format!("invalid SMTP relay host: {}", config.host()))?
            .port(config.port());

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let to = message
            .to_email
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient address: {}", message.to_email))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .context("failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;

        info!(to_email = %message.to_email, template = %message.template, "email sent");
        Ok(())
    }
}

/// Escape text interpolated into an HTML body.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Passcode email sent on every challenge issuance.
#[must_use]
pub fn otp_message(to_email: &str, username: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    let subject = format!("Your {PRODUCT_NAME} sign-in code");
    let text_body = format!(
        "Hello {username},\n\n\
         Your one-time passcode is {code}.\n\
         It expires in {ttl_minutes} minutes. Do not share it with anyone.\n\n\
         If you did not request this code, you can ignore this email.\n"
    );
    let name = escape_html(username);
    let html_body = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h3>Hello {name},</h3>\
         <p>Your one-time passcode is:</p>\
         <p style=\"font-size: 32px; font-weight: bold; letter-spacing: 5px;\">{code}</p>\
         <p>It expires in {ttl_minutes} minutes. Do not share it with anyone.</p>\
         <p style=\"color: #888; font-size: 12px;\">If you did not request this code, you can ignore this email.</p>\
         </div>"
    );

    EmailMessage {
        to_email: to_email.to_string(),
        template: "otp",
        subject,
        text_body,
        html_body,
    }
}

/// Sent once, after the first successful verification of an address.
#[must_use]
pub fn welcome_message(to_email: &str, username: &str) -> EmailMessage {
    let subject = format!("Welcome to {PRODUCT_NAME}");
    let text_body = format!(
        "Hello {username},\n\n\
         Your account is verified. You can now create and manage your notes.\n"
    );
    let name = escape_html(username);
    let html_body = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h3>Hello {name},</h3>\
         <p>Your account is verified. You can now create and manage your notes.</p>\
         </div>"
    );

    EmailMessage {
        to_email: to_email.to_string(),
        template: "welcome",
        subject,
        text_body,
        html_body,
    }
}

/// Send without surfacing failures. Returns whether delivery succeeded.
pub async fn deliver(sender: &dyn EmailSender, message: &EmailMessage) -> bool {
    match sender.send(message).await {
        Ok(()) => true,
        Err(err) => {
            error!(
                to_email = %message.to_email,
                template = %message.template,
                "email delivery failed: {err:#}"
            );
            false
        }
    }
}

/// Fire-and-forget delivery on the runtime.
pub fn spawn_delivery(
    sender: Arc<dyn EmailSender>,
    message: EmailMessage,
) -> tokio::task::JoinHandle<bool> {
    tokio::spawn(async move { deliver(sender.as_ref(), &message).await })
}
