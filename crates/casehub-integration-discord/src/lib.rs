//! Discord Integration for Casehub
//!
//! Delivers IM-channel notifications as Discord channel messages.
//!
//! # Usage
//!
//! ```rust,ignore
//! use casehub_integration_discord::{DiscordChannelAdapter, DiscordConfig};
//!
//! let config = DiscordConfig::new("your-bot-token");
//! let adapter = Arc::new(DiscordChannelAdapter::new(config));
//! let dispatcher = NotificationDispatcher::new(repo, scheduler, Default::default())
//!     .with_adapter(adapter);
//! ```

mod adapter;
mod client;
mod config;

pub use adapter::{format_message, parse_channel_id, DiscordChannelAdapter};
pub use client::DiscordClient;
pub use config::DiscordConfig;
