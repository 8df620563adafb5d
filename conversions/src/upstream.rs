use crate::config::UpstreamConfig;
use crate::event::Destination;
use crate::payload::EventEnvelope;
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Conversions API timed out after {0:?}")]
    Timeout(Duration),

    #[error("Conversions API returned {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
        body: Value,
    },

    #[error("Conversions API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cannot build conversions API URL from {0}")]
    InvalidUrl(String),
}

/// Delivery of assembled events.
#[async_trait]
pub trait ConversionsApi: Send + Sync {
    /// Returns the API's JSON reply on success.
    async fn send_events(
        &self,
        destination: &Destination,
        envelope: &EventEnvelope,
    ) -> Result<Value, UpstreamError>;
}

/// Graph API client posting to `{base_url}/{api_version}/{pixel_id}/events`.
pub struct GraphApiClient {
    client: reqwest::Client,
    base_url: Url,
    api_version: String,
    timeout: Duration,
}

impl GraphApiClient {
    pub fn new(base_url: Url, api_version: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_version: api_version.into(),
            timeout,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.api_version.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn events_url(&self, pixel_id: &str) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([self.api_version.as_str(), pixel_id, "events"]);
        Ok(url)
    }
}

#[async_trait]
impl ConversionsApi for GraphApiClient {
    async fn send_events(
        &self,
        destination: &Destination,
        envelope: &EventEnvelope,
    ) -> Result<Value, UpstreamError> {
        let url = self.events_url(&destination.pixel_id)?;

        let exchange = async {
            let response = self
                .client
                .post(url)
                .bearer_auth(&destination.access_token)
                .json(envelope)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        // The deadline covers reading the body as well as the headers
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??;

        let payload = serde_json::from_slice::<Value>(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string);
            tracing::warn!(%status, ?message, "conversions API rejected event");
            return Err(UpstreamError::Status {
                status,
                message,
                body: payload,
            });
        }

        Ok(payload)
    }
}
