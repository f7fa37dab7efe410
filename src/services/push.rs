use crate::{
    config::Config,
    error::{AppError, Result},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Provider-agnostic push message: display notification plus opaque
/// key-value metadata interpreted by the receiving client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// External message-delivery collaborator. One batch call per send;
/// any failure is an aggregate failure for the whole batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<()>;
}

/// FCM-style HTTP implementation of the delivery collaborator.
#[derive(Clone)]
pub struct FcmGateway {
    http_client: Client,
    gateway_url: String,
    server_key: String,
}

impl FcmGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.push_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            gateway_url: config.push_gateway_url.clone(),
            server_key: config.push_gateway_key.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<()> {
        let payload = json!({
            "registration_ids": tokens,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
        });

        debug!("Sending push message to {} devices", tokens.len());

        let response = self
            .http_client
            .post(&self.gateway_url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Push delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Push gateway returned status {}: {}", status, body);
            return Err(AppError::ExternalService(format!(
                "Push gateway returned status {}",
                status
            )));
        }

        Ok(())
    }
}
