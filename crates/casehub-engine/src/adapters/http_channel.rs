//! HTTP Channel Implementation
//!
//! Hands SMS and Email notifications to a gateway endpoint using reqwest.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use casehub::{Channel, ChannelAdapter, ChannelReceipt, DomainError, Notification};

pub const SIGNATURE_HEADER: &str = "X-Casehub-Signature";

fn default_timeout_ms() -> u64 {
    10_000
}

/// Gateway endpoint settings for one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    pub url: String,
    /// HMAC-SHA256 key; requests are signed when set
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HttpChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: None,
            headers: HashMap::new(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Posts each notification as JSON to a gateway
pub struct HttpChannelAdapter {
    channel: Channel,
    client: Client,
    config: HttpChannelConfig,
}

impl HttpChannelAdapter {
    pub fn new(channel: Channel, config: HttpChannelConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("casehub-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::ChannelUnavailable(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            channel,
            client,
            config,
        })
    }
}

#[async_trait]
impl ChannelAdapter for HttpChannelAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError> {
        let body = serde_json::to_vec(&gateway_payload(notification)).map_err(|e| {
            DomainError::ChannelUnavailable(format!("Failed to serialize payload: {e}"))
        })?;

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.config.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            DomainError::ChannelUnavailable(format!("{} gateway unreachable: {}", self.channel, e))
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::debug!(
                notification_id = %notification.id,
                status = status.as_u16(),
                body = %text,
                "Gateway rejected notification"
            );
            return Err(DomainError::ChannelUnavailable(format!(
                "{} gateway returned {}: {}",
                self.channel,
                status.as_u16(),
                if text.is_empty() { "No response body" } else { text.as_str() }
            )));
        }

        let provider_response: serde_json::Value =
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));
        let external_id = external_id_from(&provider_response)
            .unwrap_or_else(|| format!("{}-{}", self.channel, notification.id));

        Ok(ChannelReceipt {
            external_id,
            provider_response: json!({
                "status": status.as_u16(),
                "body": provider_response,
            }),
        })
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        let response = self
            .client
            .head(&self.config.url)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success() || resp.status().as_u16() == 405),
            Err(_) => Ok(false),
        }
    }
}

fn gateway_payload(notification: &Notification) -> serde_json::Value {
    json!({
        "id": notification.id,
        "type": notification.kind.to_string(),
        "channel": notification.channel,
        "to": notification.recipient,
        "subject": notification.subject,
        "body": notification.body,
        "case_id": notification.case_id,
    })
}

/// Gateways answer with either `id` or `message_id`
fn external_id_from(response: &serde_json::Value) -> Option<String> {
    ["message_id", "id"]
        .iter()
        .find_map(|key| response.get(*key))
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// `sha256=<hex>` HMAC-SHA256 of the request body
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
