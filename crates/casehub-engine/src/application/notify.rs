//! Helpers for notifying an account about one of its cases

use std::sync::Arc;

use chrono::{DateTime, Utc};

use casehub::{Account, Case, NotificationKind, NotificationRequest};

use super::notification_dispatcher::NotificationDispatcher;

/// Message to fan out over an account's notification channels
pub struct AccountMessage {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// One request per configured channel that has a recipient
pub fn requests_for(account: &Account, case: &Case, message: &AccountMessage) -> Vec<NotificationRequest> {
    account
        .notification_channels
        .iter()
        .filter_map(|&channel| {
            let Some(recipient) = account.recipient_for(channel) else {
                tracing::warn!(
                    account_id = %account.id,
                    channel = %channel,
                    "Account has no recipient for channel, skipping"
                );
                return None;
            };

            let mut request = NotificationRequest::new(
                message.kind.clone(),
                channel,
                recipient,
                message.body.clone(),
            )
            .for_case(case.id)
            .with_subject(message.subject.clone());
            if let Some(at) = message.scheduled_for {
                request = request.scheduled_for(at);
            }
            Some(request)
        })
        .collect()
}

/// Create notifications for an account; failures are logged, never returned
pub async fn notify_account(
    dispatcher: &Arc<NotificationDispatcher>,
    account: &Account,
    case: &Case,
    message: AccountMessage,
) -> usize {
    let mut created = 0;
    for request in requests_for(account, case, &message) {
        match dispatcher.create(request).await {
            Ok(_) => created += 1,
            Err(e) => tracing::warn!(
                case_id = %case.id,
                account_id = %account.id,
                error = %e,
                "Failed to create notification"
            ),
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use casehub::{Address, Channel, Company, NewCase, Urgency};

    #[test]
    fn test_requests_skip_channels_without_recipient() {
        let company = Company::new("Acme");
        let mut account = Account::new(company.id, "acct").with_channel(Channel::Email, "a@example.com");
        account.notification_channels.push(Channel::Sms);

        let case = Case::new(
            3,
            NewCase {
                urgency: Urgency::High,
                property_type: "house".into(),
                address: Address::new("Osaka"),
            },
        );
        let message = AccountMessage {
            kind: NotificationKind::CaseAssigned,
            subject: "subject".into(),
            body: "body".into(),
            scheduled_for: None,
        };

        let requests = requests_for(&account, &case, &message);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].channel, Channel::Email);
        assert_eq!(requests[0].recipient, "a@example.com");
        assert_eq!(requests[0].case_id, Some(case.id));
    }
}
