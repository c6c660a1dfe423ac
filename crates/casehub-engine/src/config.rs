//! Configuration management for the Casehub engine
//!
//! Read from an explicit path or from ~/.config/casehub/engine.toml;
//! everything has a default, so a missing file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use casehub::DEFAULT_MAX_RETRIES;
use casehub_integration_discord::DiscordConfig;

use crate::adapters::HttpChannelConfig;
use crate::application::{AssignmentConfig, CaseServiceConfig, DispatcherConfig};

const CONFIG_DIR: &str = "casehub";
const CONFIG_FILE: &str = "engine.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_retry_unit_secs")]
    pub retry_unit_secs: u64,
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_retry_unit_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            retry_unit_secs: default_retry_unit_secs(),
            default_max_retries: default_max_retries(),
        }
    }
}

impl From<&DispatcherSettings> for DispatcherConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            send_timeout: Duration::from_secs(settings.send_timeout_secs),
            retry_unit: Duration::from_secs(settings.retry_unit_secs),
            default_max_retries: settings.default_max_retries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    #[serde(default = "default_reminder_lead_hours")]
    pub hearing_reminder_lead_hours: i64,
    #[serde(default = "default_reservation_attempts")]
    pub reservation_attempts: u32,
}

fn default_reminder_lead_hours() -> i64 {
    24
}

fn default_reservation_attempts() -> u32 {
    3
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            hearing_reminder_lead_hours: default_reminder_lead_hours(),
            reservation_attempts: default_reservation_attempts(),
        }
    }
}

/// Channel gateways; a channel without settings runs in dry-run mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<HttpChannelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<HttpChannelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,
}

/// Engine Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// PostgreSQL connection string; in-memory stores when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub channels: ChannelSettings,
}

impl EngineConfig {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location; defaults when absent
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                anyhow::ensure!(p.exists(), "Config file {:?} does not exist", p);
                p.to_path_buf()
            }
            None => {
                let default = Self::config_path()?;
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dispatcher.retry_unit_secs > 0,
            "dispatcher.retry_unit_secs must be at least 1"
        );
        anyhow::ensure!(
            self.dispatcher.send_timeout_secs > 0,
            "dispatcher.send_timeout_secs must be at least 1"
        );
        Ok(())
    }

    /// Write this config to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        (&self.dispatcher).into()
    }

    pub fn assignment_config(&self) -> AssignmentConfig {
        AssignmentConfig {
            reservation_attempts: self.workflow.reservation_attempts.max(1),
        }
    }

    pub fn case_service_config(&self) -> CaseServiceConfig {
        CaseServiceConfig {
            hearing_reminder_lead: chrono::Duration::hours(self.workflow.hearing_reminder_lead_hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert!(config.database_url.is_none());

        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.send_timeout, Duration::from_secs(30));
        assert_eq!(dispatcher.retry_unit, Duration::from_secs(60));
        assert_eq!(dispatcher.default_max_retries, 3);
        assert_eq!(
            config.case_service_config().hearing_reminder_lead,
            chrono::Duration::hours(24)
        );
        assert!(config.channels.sms.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = EngineConfig::parse(
            r#"
            database_url = "postgres://localhost/casehub"

            [dispatcher]
            retry_unit_secs = 5
            default_max_retries = 1

            [workflow]
            hearing_reminder_lead_hours = 2

            [channels.sms]
            url = "https://sms.example.com/send"
            secret = "s3cret"

            [channels.sms.headers]
            Authorization = "Bearer abc"

            [channels.discord]
            token = "bot-token"
            fallback_channel_id = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/casehub"));
        assert_eq!(config.dispatcher.send_timeout_secs, 30);
        assert_eq!(config.dispatcher_config().retry_unit, Duration::from_secs(5));
        let sms = config.channels.sms.unwrap();
        assert_eq!(sms.secret.as_deref(), Some("s3cret"));
        assert_eq!(sms.headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
        assert_eq!(config.channels.discord.unwrap().fallback_channel_id, Some(42));
        assert!(config.channels.email.is_none());
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        let err = EngineConfig::parse("[dispatcher]\nretry_unit_secs = 0").unwrap_err();
        assert!(err.to_string().contains("retry_unit_secs"));
        assert!(EngineConfig::parse("[dispatcher]\nsend_timeout_secs = 0").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("casehub-config-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE);
        let mut config = EngineConfig::default();
        config.workflow.hearing_reminder_lead_hours = 12;

        config.save(&path).unwrap();
        let loaded = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.workflow.hearing_reminder_lead_hours, 12);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let missing = std::env::temp_dir().join("casehub-definitely-missing.toml");
        assert!(EngineConfig::load(Some(&missing)).is_err());
    }
}
