//! Channel Adapter Port
//!
//! Abstract interface for handing a notification to an external delivery
//! provider (SMS gateway, mail relay, chat platform).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::Notification;
use crate::domain::errors::DomainError;
use crate::domain::value_objects::Channel;

/// Provider acknowledgement of an accepted message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelReceipt {
    /// Provider-side message id
    pub external_id: String,
    /// Raw provider response, kept for audit
    pub provider_response: serde_json::Value,
}

/// Delivery interface for one notification channel
///
/// Implementations perform a single attempt. Retries, backoff and timeouts
/// are the dispatcher's job, so adapters should not loop internally.
///
/// # Example
///
/// ```rust,ignore
/// use casehub::ports::ChannelAdapter;
///
/// struct SmsGateway { /* reqwest client */ }
///
/// #[async_trait]
/// impl ChannelAdapter for SmsGateway {
///     fn channel(&self) -> Channel { Channel::Sms }
///
///     async fn send(&self, notification: &Notification)
///         -> Result<ChannelReceipt, DomainError>
///     {
///         // POST to the gateway
///     }
/// }
/// ```
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel served by this adapter
    fn channel(&self) -> Channel;

    /// Hand the notification to the provider
    async fn send(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
