//! Telegram bot notifications.

use super::{Notifier, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_url: String,
        token: String,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }
}

// The bot token is part of the request path; keep it out of logs.
impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<(), ServiceError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
                "parse_mode": "Markdown",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            // reqwest includes the URL in its error text
            .map_err(|e| ServiceError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let notifier = TelegramNotifier::new(
            "https://api.telegram.org".to_string(),
            "123:SECRET".to_string(),
            "42".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{:?}", notifier);
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("42"));
    }
}
