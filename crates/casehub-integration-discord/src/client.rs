//! Discord API client wrapper

use serenity::http::Http;
use serenity::model::channel::Message as SerenityMessage;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use tracing::{debug, error};

/// Discord rejects message content longer than this
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Discord API client
pub struct DiscordClient {
    http: Arc<Http>,
}

impl DiscordClient {
    /// Create a new Discord client
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }

    /// Send a message to a channel
    ///
    /// `channel_id` must be non-zero.
    pub async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<SerenityMessage, serenity::Error> {
        let channel = ChannelId::new(channel_id);
        debug!(channel_id = %channel_id, content_len = %content.len(), "Sending message to Discord");

        channel
            .say(&self.http, truncate(content, MAX_MESSAGE_LEN))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to send Discord message"))
    }
}

/// Cut to at most `max` bytes on a char boundary
pub fn truncate(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
