use anyhow::Result;
use axum::async_trait;

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Recovery email carrying a six digit reset code.
    pub fn password_reset(to: &str, project: &str, code: &str, ttl_hours: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{project} - Password Recovery"),
            body: format!(
                "Your password reset code is: {code}\n\n\
                 Enter this code to choose a new password. \
                 The code expires in {ttl_hours} hours. \
                 If you did not request a password reset, ignore this email."
            ),
        }
    }
}

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Mailer for local development that writes messages to the log
/// instead of handing them to an SMTP relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "email dispatched");
        tracing::debug!(body = %message.body, "email body");
        Ok(())
    }
}
