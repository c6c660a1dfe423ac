//! Discord configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Discord IM channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Discord bot token
    pub token: String,
    /// Channel used when a notification recipient is not a channel id
    #[serde(default)]
    pub fallback_channel_id: Option<u64>,
}

impl DiscordConfig {
    /// Create a new Discord configuration with just a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            fallback_channel_id: None,
        }
    }

    /// Set the fallback channel
    pub fn with_fallback_channel(mut self, channel_id: u64) -> Self {
        self.fallback_channel_id = Some(channel_id);
        self
    }
}
