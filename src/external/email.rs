use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::models::EmailSendResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Outbound transactional email. Any non-2xx answer from the provider is an error.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<EmailSendResponse>;
}

/// Client for a Resend-compatible `POST /emails` API.
#[derive(Clone)]
pub struct ResendEmailService {
    client: Client,
    config: EmailConfig,
}

impl ResendEmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_address(&self) -> &str {
        &self.config.from_address
    }
}

#[async_trait]
impl EmailSender for ResendEmailService {
    async fn send(&self, message: EmailMessage) -> AppResult<EmailSendResponse> {
        if self.config.api_key.is_empty() {
            return Err(AppError::ConfigError(
                "Email API key is not configured".to_string(),
            ));
        }

        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .await?;

        if response.status().is_success() {
            let sent: EmailSendResponse = response.json().await?;
            log::info!("Email sent: {} -> {:?}", sent.id, message.to);
            Ok(sent)
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "Email provider rejected message to {:?}: HTTP {}: {}",
                message.to,
                status.as_u16(),
                error_text
            );
            Err(AppError::NotificationError(format!(
                "Email provider returned HTTP {}: {}",
                status.as_u16(),
                error_text
            )))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let service = ResendEmailService::new(EmailConfig {
            api_key: String::new(),
            ..EmailConfig::default()
        });
        let result = service
            .send(EmailMessage {
                from: service.from_address().to_string(),
                to: vec!["buyer@example.com".to_string()],
                subject: "Hello".to_string(),
                html: "<p>Hi</p>".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
