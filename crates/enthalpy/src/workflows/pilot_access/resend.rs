use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::warn;

use super::mailer::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};
use crate::config::MailConfig;

/// Connection settings for the Resend HTTP API.
#[derive(Clone)]
pub struct ResendSettings {
    pub api_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl ResendSettings {
    /// `None` when no credential is configured.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        config.api_key.as_ref().map(|api_key| Self {
            api_key: api_key.clone(),
            api_base: config.api_base.clone(),
            timeout: config.timeout,
        })
    }
}

/// [`Mailer`] backed by `POST {api_base}/emails`.
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl ResendMailer {
    pub fn new(settings: ResendSettings) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| MailerError::Transport(err.to_string()))?;
        let endpoint = format!("{}/emails", settings.api_base.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key,
        })
    }

    fn map_error(err: reqwest::Error) -> MailerError {
        if err.is_timeout() {
            MailerError::Timeout
        } else {
            MailerError::Transport(err.to_string())
        }
    }
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendMailer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(email)
            .send()
            .await
            .map_err(Self::map_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        // The provider has accepted the message once the status is 2xx; the
        // body only carries the message id.
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "accepted email response body could not be read");
                return Ok(DeliveryReceipt::default());
            }
        };

        Ok(DeliveryReceipt {
            message_id: message_id_from(&body),
        })
    }
}

fn message_id_from(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<SendResponse>(body) {
        Ok(parsed) => parsed.id,
        Err(err) => {
            warn!(error = %err, "accepted email response carried no readable message id");
            None
        }
    }
}
