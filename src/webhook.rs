//! Automation webhook client
//!
//! Server-to-server calls to the external workflow-automation endpoints
//! that generate and publish posts. The browser never talks to these
//! endpoints directly; this client is the proxy boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::WebhookConfig;
use crate::error::AppError;
use crate::metrics::{WEBHOOK_REQUEST_DURATION_SECONDS, WEBHOOK_REQUESTS_TOTAL};

/// Payload forwarded to the generate endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GeneratePayload {
    pub theme: String,
    pub post_type: String,
    pub length: String,
    pub tone: String,
    pub brand_context: String,
}

/// Payload forwarded to the publish endpoint
#[derive(Debug, Clone, Serialize)]
pub struct PublishPayload {
    pub post_text: String,
    pub metadata: serde_json::Value,
}

/// Client for the automation webhook endpoints
pub struct WebhookClient {
    http_client: Arc<reqwest::Client>,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(http_client: Arc<reqwest::Client>, config: WebhookConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Brand context to use when the caller does not supply one
    pub fn default_brand_context(&self) -> &str {
        &self.config.default_brand_context
    }

    /// Call the generate endpoint
    ///
    /// # Returns
    /// The generated post text (the endpoint responds with plain text)
    ///
    /// # Errors
    /// Returns an upstream error if the endpoint is unreachable, times
    /// out, or responds with a non-success status
    pub async fn generate(&self, payload: &GeneratePayload) -> Result<String, AppError> {
        let started = Instant::now();

        let result = self
            .http_client
            .post(&self.config.generate_url)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(payload)
            .send()
            .await;

        WEBHOOK_REQUEST_DURATION_SECONDS
            .with_label_values(&["generate"])
            .observe(started.elapsed().as_secs_f64());

        let response = result.inspect_err(|_| {
            WEBHOOK_REQUESTS_TOTAL
                .with_label_values(&["generate", "error"])
                .inc();
        })?;

        if !response.status().is_success() {
            WEBHOOK_REQUESTS_TOTAL
                .with_label_values(&["generate", "rejected"])
                .inc();
            return Err(AppError::Upstream(format!(
                "generate webhook returned {}",
                response.status()
            )));
        }

        WEBHOOK_REQUESTS_TOTAL
            .with_label_values(&["generate", "success"])
            .inc();

        Ok(response.text().await?)
    }

    /// Call the publish endpoint
    ///
    /// # Returns
    /// The endpoint's JSON result, relayed to the caller verbatim
    ///
    /// # Errors
    /// Returns an upstream error if the endpoint is unreachable, times
    /// out, or responds with a non-success status
    pub async fn publish(&self, payload: &PublishPayload) -> Result<serde_json::Value, AppError> {
        let started = Instant::now();

        let result = self
            .http_client
            .post(&self.config.publish_url)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(payload)
            .send()
            .await;

        WEBHOOK_REQUEST_DURATION_SECONDS
            .with_label_values(&["publish"])
            .observe(started.elapsed().as_secs_f64());

        let response = result.inspect_err(|_| {
            WEBHOOK_REQUESTS_TOTAL
                .with_label_values(&["publish", "error"])
                .inc();
        })?;

        if !response.status().is_success() {
            WEBHOOK_REQUESTS_TOTAL
                .with_label_values(&["publish", "rejected"])
                .inc();
            return Err(AppError::Upstream(format!(
                "publish webhook returned {}",
                response.status()
            )));
        }

        WEBHOOK_REQUESTS_TOTAL
            .with_label_values(&["publish", "success"])
            .inc();

        Ok(response.json().await?)
    }
}
