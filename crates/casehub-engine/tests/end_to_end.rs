//! Intake to notification, through the wired engine

use std::sync::Arc;
use std::time::Duration;

use casehub::{
    Account, AccountRepository, Address, AssignmentMethod, CaseEventType, CaseStatus, Channel,
    Company, CompanyRepository, ContactLog, NewCase, NotificationKind, NotificationStatus, Urgency,
};
use casehub_engine::adapters::ManualScheduler;
use casehub_engine::{Engine, EngineConfig, Stores};

async fn engine_with_accounts(scheduler: Arc<ManualScheduler>) -> (Engine, Account, Account) {
    let engine = Engine::build(&EngineConfig::default(), Stores::in_memory(), scheduler).unwrap();

    let company = engine
        .stores
        .companies
        .insert(&Company::new("Acme Realty").with_monthly_cap(10))
        .await
        .unwrap();

    let a = Account::new(company.id, "A")
        .with_areas(["Tokyo"])
        .with_property_types(["house"])
        .with_capacity(0, 10)
        .with_priority(10)
        .with_channel(Channel::Sms, "+81-90-1111-1111");
    let b = Account::new(company.id, "B")
        .with_areas(["Tokyo"])
        .with_property_types(["house"])
        .with_capacity(0, 10)
        .with_priority(5)
        .with_preferred_areas(["Tokyo"])
        .with_channel(Channel::Email, "b@example.com")
        .with_channel(Channel::Im, "123456789");
    let a = engine.stores.accounts.insert(&a).await.unwrap();
    let b = engine.stores.accounts.insert(&b).await.unwrap();

    (engine, a, b)
}

#[tokio::test]
async fn urgent_case_is_routed_and_notified() {
    let scheduler = Arc::new(ManualScheduler::new());
    let (engine, _a, b) = engine_with_accounts(scheduler.clone()).await;
    let mut live = engine.live_updates.subscribe();

    let case = engine
        .cases
        .create_case(NewCase {
            urgency: Urgency::Urgent,
            property_type: "house".into(),
            address: Address::new("Tokyo"),
        })
        .await
        .unwrap();
    assert_eq!(case.case_number, 1);

    let assigned = engine.assignments.auto_assign(case.id).await.unwrap();

    // B: 5 + 10 (preferred) + 20 (urgent) = 35 beats A: 10 + 20 = 30
    assert_eq!(assigned.status, CaseStatus::Assigned);
    assert_eq!(assigned.assigned_account_id, Some(b.id));
    assert_eq!(assigned.assignment_method, Some(AssignmentMethod::Automatic));

    let account = engine.stores.accounts.get(b.id).await.unwrap();
    assert_eq!(account.availability.current_load, 1);

    let created = live.recv().await.unwrap();
    assert_eq!(created.event_type, CaseEventType::Created);
    let event = live.recv().await.unwrap();
    assert_eq!(event.event_type, CaseEventType::Assigned);
    assert_eq!(event.case_id, case.id);
    assert_eq!(event.payload["account_id"], serde_json::json!(b.id));

    let notifications = engine.dispatcher.find_by_case(case.id).await.unwrap();
    assert_eq!(notifications.len(), 2);
    for n in &notifications {
        assert_eq!(n.kind, NotificationKind::CaseAssigned);
        assert_eq!(n.status, NotificationStatus::Sent);
    }
    let mut channels: Vec<Channel> = notifications.iter().map(|n| n.channel).collect();
    channels.sort_by_key(|c| c.to_string());
    assert_eq!(channels, vec![Channel::Email, Channel::Im]);
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn hearing_reminder_fires_a_day_before() {
    let scheduler = Arc::new(ManualScheduler::new());
    let (engine, a, _b) = engine_with_accounts(scheduler.clone()).await;

    let case = engine
        .cases
        .create_case(NewCase {
            urgency: Urgency::Normal,
            property_type: "house".into(),
            address: Address::new("Tokyo"),
        })
        .await
        .unwrap();
    let case = engine
        .assignments
        .assign(casehub_engine::AssignRequest::new(case.id, a.company_id, a.id, "ops"))
        .await
        .unwrap();
    engine
        .cases
        .log_contact(case.id, ContactLog::new("A", "phone", None))
        .await
        .unwrap();

    let hearing_at = scheduler_now(&scheduler) + chrono::Duration::days(2);
    engine.cases.schedule_hearing(case.id, hearing_at, "A").await.unwrap();

    let reminder = engine
        .dispatcher
        .find_by_case(case.id)
        .await
        .unwrap()
        .into_iter()
        .find(|n| n.kind == NotificationKind::HearingReminder)
        .unwrap();
    assert_eq!(reminder.status, NotificationStatus::Pending);

    scheduler.advance(Duration::from_secs(23 * 3600)).await;
    assert_eq!(
        engine.dispatcher.get(reminder.id).await.unwrap().status,
        NotificationStatus::Pending
    );

    scheduler.advance(Duration::from_secs(2 * 3600)).await;
    let reminder = engine.dispatcher.get(reminder.id).await.unwrap();
    assert_eq!(reminder.status, NotificationStatus::Sent);
    assert_eq!(reminder.recipient, "+81-90-1111-1111");
}

fn scheduler_now(scheduler: &ManualScheduler) -> chrono::DateTime<chrono::Utc> {
    use casehub::Clock;
    scheduler.now()
}
