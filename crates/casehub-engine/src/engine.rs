//! Service wiring
//!
//! Builds stores, channel adapters, the event bus and the application
//! services from an `EngineConfig`.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;

use casehub::{
    Account, AccountRepository, CaseFilter, CaseRepository, CaseStatus, Channel, ChannelAdapter,
    Company, CompanyRepository, DomainError, NewCase, NotificationRepository, Scheduler,
};
use casehub_integration_discord::DiscordChannelAdapter;

use crate::adapters::{
    postgres, EventLogger, HttpChannelAdapter, InMemoryAccountRepository, InMemoryCaseRepository,
    InMemoryCompanyRepository, InMemoryNotificationRepository, LiveUpdateBroadcaster,
    LoggingChannelAdapter, PgAccountRepository, PgCaseRepository, PgCompanyRepository,
    PgNotificationRepository,
};
use crate::application::{AssignmentEngine, CaseService, EventBus, NotificationDispatcher};
use crate::config::EngineConfig;

const LIVE_UPDATE_CAPACITY: usize = 256;

/// Store handles shared by the services
#[derive(Clone)]
pub struct Stores {
    pub cases: Arc<dyn CaseRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            cases: Arc::new(InMemoryCaseRepository::new()),
            accounts: Arc::new(InMemoryAccountRepository::new()),
            companies: Arc::new(InMemoryCompanyRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
        }
    }

    /// Connect and migrate the PostgreSQL database
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        postgres::migrate(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations completed");

        Ok(Self {
            cases: Arc::new(PgCaseRepository::new(pool.clone())),
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        })
    }
}

/// Fully wired application services
pub struct Engine {
    pub stores: Stores,
    pub events: Arc<EventBus>,
    pub live_updates: Arc<LiveUpdateBroadcaster>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub assignments: AssignmentEngine,
    pub cases: CaseService,
}

impl Engine {
    /// Wire services over the given stores and scheduler
    pub fn build(
        config: &EngineConfig,
        stores: Stores,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let events = Arc::new(EventBus::new());
        let live_updates = Arc::new(LiveUpdateBroadcaster::new(LIVE_UPDATE_CAPACITY));
        events.subscribe(Arc::new(EventLogger));
        events.subscribe(live_updates.clone());

        let mut dispatcher = NotificationDispatcher::new(
            stores.notifications.clone(),
            scheduler,
            config.dispatcher_config(),
        );
        for adapter in channel_adapters(config)? {
            dispatcher = dispatcher.with_adapter(adapter);
        }
        let dispatcher = Arc::new(dispatcher);

        let assignments = AssignmentEngine::new(
            stores.cases.clone(),
            stores.accounts.clone(),
            stores.companies.clone(),
            dispatcher.clone(),
            events.clone(),
        )
        .with_config(config.assignment_config());

        let cases = CaseService::new(
            stores.cases.clone(),
            stores.accounts.clone(),
            dispatcher.clone(),
            events.clone(),
        )
        .with_config(config.case_service_config());

        Ok(Self {
            stores,
            events,
            live_updates,
            dispatcher,
            assignments,
            cases,
        })
    }

    /// Run automatic assignment over every unassigned case
    ///
    /// Rejections are logged and counted; other errors stop the sweep.
    pub async fn assign_pending(&self) -> Result<AssignSummary, DomainError> {
        let pending = self
            .stores
            .cases
            .find(&CaseFilter::with_status(CaseStatus::PendingAssignment))
            .await?;

        let mut summary = AssignSummary::default();
        for case in pending {
            match self.assignments.auto_assign(case.id).await {
                Ok(_) => summary.assigned += 1,
                Err(DomainError::AssignmentRejected(reason)) => {
                    tracing::warn!(case_id = %case.id, case_number = case.case_number, %reason, "Case left unassigned");
                    summary.unassigned += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(case_id = %case.id, error = %e, "Case changed during assignment, skipped");
                    summary.unassigned += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// Load companies, accounts and new cases from a seed document
    pub async fn import_seed(&self, seed: Seed) -> Result<(), DomainError> {
        for company in &seed.companies {
            self.stores.companies.insert(company).await?;
        }
        for account in &seed.accounts {
            self.stores.accounts.insert(account).await?;
        }
        for intake in seed.cases {
            self.cases.create_case(intake).await?;
        }

        tracing::info!(
            companies = seed.companies.len(),
            accounts = seed.accounts.len(),
            "Seed imported"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssignSummary {
    pub assigned: usize,
    pub unassigned: usize,
}

/// Seed file contents
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub cases: Vec<NewCase>,
}

impl Seed {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse seed file")
    }
}

/// Gateways from config; channels without one fall back to dry-run logging
fn channel_adapters(config: &EngineConfig) -> Result<Vec<Arc<dyn ChannelAdapter>>> {
    let channels = &config.channels;
    let mut adapters: Vec<Arc<dyn ChannelAdapter>> = Vec::new();

    for (channel, settings) in [(Channel::Sms, &channels.sms), (Channel::Email, &channels.email)] {
        match settings {
            Some(settings) => {
                let adapter = HttpChannelAdapter::new(channel, settings.clone())
                    .with_context(|| format!("Failed to set up {} gateway", channel))?;
                adapters.push(Arc::new(adapter));
            }
            None => {
                tracing::warn!(channel = %channel, "No gateway configured, using dry-run channel");
                adapters.push(Arc::new(LoggingChannelAdapter::new(channel)));
            }
        }
    }

    match &channels.discord {
        Some(discord) if !discord.token.is_empty() => {
            adapters.push(Arc::new(DiscordChannelAdapter::new(discord.clone())));
        }
        _ => {
            tracing::warn!(channel = %Channel::Im, "No Discord token configured, using dry-run channel");
            adapters.push(Arc::new(LoggingChannelAdapter::new(Channel::Im)));
        }
    }

    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualScheduler;

    const SEED: &str = r#"{
        "companies": [
            {"id": "00000000-0000-0000-0000-0000000000c1", "name": "Acme", "is_active": true}
        ],
        "accounts": [
            {
                "id": "00000000-0000-0000-0000-0000000000a1",
                "company_id": "00000000-0000-0000-0000-0000000000c1",
                "name": "Tokyo desk",
                "is_active": true,
                "operating_areas": ["Tokyo"],
                "supported_property_types": ["house"],
                "contact": {"email": "tokyo@example.com"},
                "notification_channels": ["email"]
            }
        ],
        "cases": [
            {"urgency": "urgent", "property_type": "house", "address": {"prefecture": "Tokyo"}},
            {"property_type": "house", "address": {"prefecture": "Hokkaido"}}
        ]
    }"#;

    #[tokio::test]
    async fn test_seed_and_assign_pending() {
        let engine = Engine::build(
            &EngineConfig::default(),
            Stores::in_memory(),
            Arc::new(ManualScheduler::new()),
        )
        .unwrap();

        engine.import_seed(Seed::from_json(SEED).unwrap()).await.unwrap();
        let summary = engine.assign_pending().await.unwrap();

        assert_eq!(summary, AssignSummary { assigned: 1, unassigned: 1 });
        assert!(engine.dispatcher.has_adapter(Channel::Sms));
        assert!(engine.dispatcher.has_adapter(Channel::Im));
    }
}
