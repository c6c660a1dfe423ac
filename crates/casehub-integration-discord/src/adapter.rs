//! ChannelAdapter implementation for Discord (IM channel)

use async_trait::async_trait;
use casehub::{Channel, ChannelAdapter, ChannelReceipt, DomainError, Notification};
use tracing::debug;

use crate::client::DiscordClient;
use crate::config::DiscordConfig;

/// Posts IM notifications to the Discord channel named by the recipient
pub struct DiscordChannelAdapter {
    client: DiscordClient,
    config: DiscordConfig,
}

impl DiscordChannelAdapter {
    pub fn new(config: DiscordConfig) -> Self {
        let client = DiscordClient::new(&config.token);
        Self { client, config }
    }

    /// Resolve the recipient to a channel id, falling back to the configured one
    fn channel_id(&self, notification: &Notification) -> Result<u64, DomainError> {
        parse_channel_id(&notification.recipient)
            .or(self.config.fallback_channel_id.filter(|id| *id != 0))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "recipient '{}' is not a Discord channel id",
                    notification.recipient
                ))
            })
    }
}

#[async_trait]
impl ChannelAdapter for DiscordChannelAdapter {
    fn channel(&self) -> Channel {
        Channel::Im
    }

    async fn send(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError> {
        let channel_id = self.channel_id(notification)?;
        debug!(
            notification_id = %notification.id,
            channel_id = %channel_id,
            "Posting notification to Discord"
        );

        let message = self
            .client
            .send_message(channel_id, &format_message(notification))
            .await
            .map_err(|e| DomainError::ChannelUnavailable(format!("Discord API error: {}", e)))?;

        Ok(ChannelReceipt {
            external_id: message.id.to_string(),
            provider_response: serde_json::json!({
                "channel_id": message.channel_id.to_string(),
                "message_id": message.id.to_string(),
            }),
        })
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(!self.config.token.is_empty())
    }
}

/// Accepts a raw id or a `<#id>` channel mention; zero is never valid
pub fn parse_channel_id(recipient: &str) -> Option<u64> {
    let trimmed = recipient.trim();
    let raw = trimmed
        .strip_prefix("<#")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed);
    raw.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Subject in bold on the first line, then the body
pub fn format_message(notification: &Notification) -> String {
    match &notification.subject {
        Some(subject) => format!("**{}**\n{}", subject, notification.body),
        None => notification.body.clone(),
    }
}
