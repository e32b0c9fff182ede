//! Outbound email.
//!
//! Messages go through the SendGrid v3 API when a key is configured. Without
//! one, a [`LogMailer`] records what would have been sent and drops it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medflow_config::EmailConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").expect("tag pattern compiles"));

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail provider rejected the message ({status}): {body}")]
    Provider { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    /// Builds the plain-text alternative by stripping tags from `html`.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let text = strip_html(&html);
        Self {
            to: to.into(),
            subject: subject.into(),
            html,
            text,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

pub type SharedMailer = Arc<dyn Mailer>;

pub fn mailer_from_config(config: &EmailConfig) -> Result<SharedMailer, MailError> {
    match config.sendgrid_api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(Arc::new(SendGridMailer::new(config, key)?)),
        _ => {
            warn!("sendgrid api key not configured; email sending is disabled");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from: String,
    api_base: String,
}

impl SendGridMailer {
    pub fn new(config: &EmailConfig, api_key: &str) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from: config.from.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, to = %message.to, "sendgrid rejected message");
            return Err(MailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Used when no provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        warn!(to = %message.to, subject = %message.subject, "email not sent: provider not configured");
        debug!(text = %message.text, "dropped email body");
        Ok(())
    }
}

pub fn strip_html(html: &str) -> String {
    let stripped = TAGS.replace_all(html, "");
    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn invite_email(to: &str, invite_url: &str, clinic_name: &str, invited_by: &str) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family:system-ui, -apple-system, Roboto, 'Segoe UI', Helvetica, Arial; color:#0f172a">
  <h2 style="color:#0f172a">You were invited to join {clinic_name}</h2>
  <p>Click the button below to accept the invitation by {invited_by}.</p>
  <p style="margin:18px 0">
    <a href="{invite_url}" style="display:inline-block;padding:10px 16px;background:#2563eb;color:#fff;border-radius:6px;text-decoration:none">Accept Invite</a>
  </p>
  <p>Or open this link: {invite_url}</p>
  <p style="color:#64748b;font-size:13px">If you didn't expect this invitation, you can ignore this email.</p>
</div>"#
    );
    EmailMessage::new(to, "You were invited to MedFlow", html)
}

pub fn password_reset_email(to: &str, reset_url: &str) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family:system-ui, -apple-system, Roboto, 'Segoe UI', Helvetica, Arial; color:#0f172a">
  <h2 style="color:#0f172a">Reset your password</h2>
  <p>Use the button below to create a new password. This link expires in one hour.</p>
  <p style="margin:18px 0">
    <a href="{reset_url}" style="display:inline-block;padding:10px 16px;background:#059669;color:#fff;border-radius:6px;text-decoration:none">Reset password</a>
  </p>
  <p>Or open this link: {reset_url}</p>
  <p style="color:#64748b;font-size:13px">If you didn't request a password reset, you can ignore this email.</p>
</div>"#
    );
    EmailMessage::new(to, "Reset your MedFlow password", html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_keeps_text_lines() {
        let text = strip_html("<div>\n  <h2>Hello</h2>\n  <p>World <b>!</b></p>\n</div>");
        assert_eq!(text, "Hello\nWorld !");
    }

    #[test]
    fn invite_email_contains_link_in_both_parts() {
        let message = invite_email(
            "new@clinic.test",
            "http://app.test/auth/invite/accept?token=abc",
            "Sunrise Clinic",
            "admin@clinic.test",
        );
        assert_eq!(message.subject, "You were invited to MedFlow");
        assert!(message.html.contains("href=\"http://app.test/auth/invite/accept?token=abc\""));
        assert!(message.text.contains("http://app.test/auth/invite/accept?token=abc"));
        assert!(message.text.contains("You were invited to join Sunrise Clinic"));
        assert!(!message.text.contains('<'));
    }

    #[test]
    fn reset_email_mentions_expiry() {
        let message = password_reset_email("a@b.test", "http://app.test/reset");
        assert!(message.text.contains("expires in one hour"));
    }

    #[test]
    fn missing_key_falls_back_to_log_mailer() {
        let config = EmailConfig::default();
        assert!(mailer_from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let message = EmailMessage::new("a@b.test", "Subject", "<p>Body</p>");
        assert!(LogMailer.send(message).await.is_ok());
    }
}
