//! Channel - Notification delivery medium

use serde::{Deserialize, Serialize};

/// Notification delivery channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
    /// Instant messaging (chat platform)
    Im,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Email => write!(f, "email"),
            Channel::Im => write!(f, "im"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            "im" => Ok(Channel::Im),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}
