use async_trait::async_trait;

use crate::account::errors::NotifierError;
use crate::account::ports::Notifier;
use crate::config::Config;

/// Notifier that writes the links a user would receive by email to the log.
///
/// Stands in for a mail provider in development: the verification and reset
/// links can be copied straight from the service output.
pub struct LogNotifier {
    app_base_url: String,
}

impl LogNotifier {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        let app_base_url = app_base_url.into().trim_end_matches('/').to_string();
        Self { app_base_url }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.mail.app_base_url.as_str())
    }

    pub fn email_verification_link(&self, token: &str) -> String {
        format!("{}/auth/verify-email?token={}", self.app_base_url, token)
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!("{}/auth/reset-password?token={}", self.app_base_url, token)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email_verification(&self, email: &str, token: &str) -> Result<(), NotifierError> {
        tracing::info!(
            to = %email,
            link = %self.email_verification_link(token),
            "Email verification message"
        );
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), NotifierError> {
        tracing::info!(
            to = %email,
            link = %self.password_reset_link(token),
            "Password reset message"
        );
        Ok(())
    }
}
