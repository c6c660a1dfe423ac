//! Account - Fulfillment party that receives cases
//!
//! Pure domain entity without infrastructure dependencies.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Channel;

/// Account - fulfillment party owned by a company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// Region codes (prefectures) this account serves
    #[serde(default)]
    pub operating_areas: BTreeSet<String>,
    #[serde(default)]
    pub supported_property_types: BTreeSet<String>,
    pub is_active: bool,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
    /// Base score for automatic assignment
    #[serde(default)]
    pub priority_score: i64,
    #[serde(default)]
    pub contact: AccountContact,
    /// Channels used when the account is notified
    #[serde(default)]
    pub notification_channels: Vec<Channel>,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub current_load: u32,
    pub max_capacity: u32,
    pub can_accept_new_cases: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Preferences {
    #[serde(default)]
    pub preferred_areas: BTreeSet<String>,
    #[serde(default)]
    pub excluded_areas: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceMetrics {
    /// Percentage, 0-100
    pub conversion_rate: f64,
    /// Percentage, 0-100
    pub customer_satisfaction: f64,
}

/// Where to reach the account on each channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccountContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    /// IM destination, e.g. a chat channel id
    pub im_channel: Option<String>,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            current_load: 0,
            max_capacity: 10,
            can_accept_new_cases: true,
        }
    }
}

impl Availability {
    /// Whether one more case fits
    pub fn has_capacity(&self) -> bool {
        self.can_accept_new_cases && self.current_load < self.max_capacity
    }
}

impl Account {
    /// Create an active account with default availability
    pub fn new(company_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            operating_areas: BTreeSet::new(),
            supported_property_types: BTreeSet::new(),
            is_active: true,
            availability: Availability::default(),
            preferences: Preferences::default(),
            performance_metrics: PerformanceMetrics::default(),
            priority_score: 0,
            contact: AccountContact::default(),
            notification_channels: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operating_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_property_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capacity(mut self, current_load: u32, max_capacity: u32) -> Self {
        self.availability.current_load = current_load;
        self.availability.max_capacity = max_capacity;
        self
    }

    pub fn with_priority(mut self, priority_score: i64) -> Self {
        self.priority_score = priority_score;
        self
    }

    pub fn with_preferred_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferences.preferred_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferences.excluded_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_performance(mut self, conversion_rate: f64, customer_satisfaction: f64) -> Self {
        self.performance_metrics = PerformanceMetrics {
            conversion_rate,
            customer_satisfaction,
        };
        self
    }

    pub fn with_channel(mut self, channel: Channel, recipient: impl Into<String>) -> Self {
        let recipient = recipient.into();
        match channel {
            Channel::Sms => self.contact.phone = Some(recipient),
            Channel::Email => self.contact.email = Some(recipient),
            Channel::Im => self.contact.im_channel = Some(recipient),
        }
        if !self.notification_channels.contains(&channel) {
            self.notification_channels.push(channel);
        }
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Address of this account on a channel, if configured
    pub fn recipient_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Sms => self.contact.phone.as_deref(),
            Channel::Email => self.contact.email.as_deref(),
            Channel::Im => self.contact.im_channel.as_deref(),
        }
    }
}
