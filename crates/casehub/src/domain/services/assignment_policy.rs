//! Assignment Policy
//!
//! Eligibility predicates and the scoring formula used to route a case to
//! an account. Manual and automatic assignment share the same predicates.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{Account, Case, Company};

/// Bonus for a case in one of the account's preferred areas
pub const PREFERRED_AREA_BONUS: i64 = 10;
/// Penalty applied to a fully loaded account
pub const MAX_LOAD_PENALTY: i64 = 20;

/// Why a company or account cannot take a case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    CompanyInactive,
    MonthlyCapReached { cap: u32 },
    AccountInactive,
    CompanyMismatch,
    NoCapacity { current_load: u32, max_capacity: u32 },
    AreaNotCovered(String),
    AreaExcluded(String),
    PropertyTypeUnsupported(String),
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CompanyInactive => write!(f, "company is inactive"),
            Self::MonthlyCapReached { cap } => {
                write!(f, "company reached its monthly case cap ({})", cap)
            }
            Self::AccountInactive => write!(f, "account is inactive"),
            Self::CompanyMismatch => write!(f, "account does not belong to company"),
            Self::NoCapacity {
                current_load,
                max_capacity,
            } => write!(
                f,
                "account has no capacity ({}/{})",
                current_load, max_capacity
            ),
            Self::AreaNotCovered(area) => write!(f, "account does not cover area {}", area),
            Self::AreaExcluded(area) => write!(f, "account excludes area {}", area),
            Self::PropertyTypeUnsupported(t) => {
                write!(f, "account does not support property type {}", t)
            }
        }
    }
}

/// An eligible account with its computed score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub account_id: Uuid,
    pub company_id: Uuid,
    pub score: i64,
}

/// Whether `company` can take `case` at `at`
///
/// A case already held by the company does not need a new monthly slot,
/// so only the active flag applies to it.
pub fn check_company(company: &Company, case: &Case, at: DateTime<Utc>) -> Result<(), Ineligibility> {
    if !company.is_active {
        return Err(Ineligibility::CompanyInactive);
    }
    let takes_slot = case.assigned_company_id != Some(company.id);
    if takes_slot && !company.under_monthly_cap(at) {
        return Err(Ineligibility::MonthlyCapReached {
            cap: company.monthly_case_cap.unwrap_or_default(),
        });
    }
    Ok(())
}

pub fn check_account(account: &Account, case: &Case) -> Result<(), Ineligibility> {
    if !account.is_active {
        return Err(Ineligibility::AccountInactive);
    }
    if !account.availability.has_capacity() {
        return Err(Ineligibility::NoCapacity {
            current_load: account.availability.current_load,
            max_capacity: account.availability.max_capacity,
        });
    }
    let area = case.area();
    if !account.operating_areas.contains(area) {
        return Err(Ineligibility::AreaNotCovered(area.to_string()));
    }
    if account.preferences.excluded_areas.contains(area) {
        return Err(Ineligibility::AreaExcluded(area.to_string()));
    }
    if !account
        .supported_property_types
        .contains(&case.property_type)
    {
        return Err(Ineligibility::PropertyTypeUnsupported(
            case.property_type.clone(),
        ));
    }
    Ok(())
}

/// Automatic assignment score
///
/// `priority + preferred-area bonus + urgency bonus - load penalty + performance bonus`
pub fn score(account: &Account, case: &Case) -> i64 {
    let preferred = if account.preferences.preferred_areas.contains(case.area()) {
        PREFERRED_AREA_BONUS
    } else {
        0
    };

    account.priority_score + preferred + case.urgency.score_bonus() - load_penalty(account)
        + performance_bonus(account)
}

pub fn load_penalty(account: &Account) -> i64 {
    let availability = &account.availability;
    if availability.max_capacity == 0 {
        return MAX_LOAD_PENALTY;
    }
    // integer division floors for non-negative operands
    MAX_LOAD_PENALTY * i64::from(availability.current_load) / i64::from(availability.max_capacity)
}

pub fn performance_bonus(account: &Account) -> i64 {
    let metrics = &account.performance_metrics;
    metrics.conversion_rate.floor() as i64 + (metrics.customer_satisfaction / 10.0).floor() as i64
}

/// Highest score wins; equal scores go to the lowest account id
pub fn pick_best(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().max_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then_with(|| b.account_id.cmp(&a.account_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Address, NewCase};
    use crate::domain::value_objects::Urgency;

    fn tokyo_case(urgency: Urgency) -> Case {
        Case::new(
            1,
            NewCase {
                urgency,
                property_type: "house".into(),
                address: Address::new("Tokyo"),
            },
        )
    }

    fn tokyo_account(company: &Company) -> Account {
        Account::new(company.id, "acct")
            .with_areas(["Tokyo"])
            .with_property_types(["house"])
            .with_capacity(0, 10)
    }

    #[test]
    fn test_preferred_area_beats_higher_priority_for_urgent_case() {
        let company = Company::new("Acme");
        let case = tokyo_case(Urgency::Urgent);
        let a = tokyo_account(&company).with_priority(10);
        let b = tokyo_account(&company)
            .with_priority(5)
            .with_preferred_areas(["Tokyo"]);

        assert_eq!(score(&a, &case), 30);
        assert_eq!(score(&b, &case), 35);
    }

    #[test]
    fn test_load_penalty_floors() {
        let company = Company::new("Acme");
        let account = tokyo_account(&company).with_capacity(1, 3);
        // 20 * 1 / 3 = 6.66 -> 6
        assert_eq!(load_penalty(&account), 6);
        let full = tokyo_account(&company).with_capacity(10, 10);
        assert_eq!(load_penalty(&full), 20);
    }

    #[test]
    fn test_performance_bonus_floors() {
        let company = Company::new("Acme");
        let account = tokyo_account(&company).with_performance(12.9, 87.5);
        assert_eq!(performance_bonus(&account), 12 + 8);
    }

    #[test]
    fn test_urgency_bonus() {
        let company = Company::new("Acme");
        let account = tokyo_account(&company);
        assert_eq!(score(&account, &tokyo_case(Urgency::High)), 10);
        assert_eq!(score(&account, &tokyo_case(Urgency::Normal)), 0);
        assert_eq!(score(&account, &tokyo_case(Urgency::Low)), 0);
    }

    #[test]
    fn test_eligibility_predicates() {
        let company = Company::new("Acme");
        let case = tokyo_case(Urgency::Normal);

        assert!(check_account(&tokyo_account(&company), &case).is_ok());
        assert_eq!(
            check_account(&tokyo_account(&company).inactive(), &case),
            Err(Ineligibility::AccountInactive)
        );
        assert!(matches!(
            check_account(&tokyo_account(&company).with_capacity(10, 10), &case),
            Err(Ineligibility::NoCapacity { .. })
        ));
        assert_eq!(
            check_account(&tokyo_account(&company).with_areas(["Osaka"]), &case),
            Err(Ineligibility::AreaNotCovered("Tokyo".into()))
        );
        assert_eq!(
            check_account(&tokyo_account(&company).with_excluded_areas(["Tokyo"]), &case),
            Err(Ineligibility::AreaExcluded("Tokyo".into()))
        );
        assert_eq!(
            check_account(&tokyo_account(&company).with_property_types(["condo"]), &case),
            Err(Ineligibility::PropertyTypeUnsupported("house".into()))
        );
    }

    #[test]
    fn test_company_checks() {
        let case = tokyo_case(Urgency::Normal);
        let now = Utc::now();

        assert!(check_company(&Company::new("Acme"), &case, now).is_ok());
        assert_eq!(
            check_company(&Company::new("Acme").inactive(), &case, now),
            Err(Ineligibility::CompanyInactive)
        );
        let mut capped = Company::new("Acme").with_monthly_cap(2);
        capped.record_case(now);
        capped.record_case(now);
        assert_eq!(
            check_company(&capped, &case, now),
            Err(Ineligibility::MonthlyCapReached { cap: 2 })
        );
    }

    #[test]
    fn test_capped_company_keeps_its_own_case() {
        let now = Utc::now();
        let mut capped = Company::new("Acme").with_monthly_cap(1);
        capped.record_case(now);

        let mut held = tokyo_case(Urgency::Normal);
        held.assigned_company_id = Some(capped.id);
        assert!(check_company(&capped, &held, now).is_ok());
        assert_eq!(
            check_company(&capped.clone().inactive(), &held, now),
            Err(Ineligibility::CompanyInactive)
        );
    }

    #[test]
    fn test_cap_frees_up_next_month() {
        let case = tokyo_case(Urgency::Normal);
        let mut capped = Company::new("Acme").with_monthly_cap(1);
        let last_month = Utc::now() - chrono::Duration::days(40);
        capped.record_case(last_month);

        assert!(check_company(&capped, &case, last_month).is_err());
        assert!(check_company(&capped, &case, Utc::now()).is_ok());
    }

    #[test]
    fn test_tie_goes_to_lowest_account_id() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let company_id = Uuid::new_v4();
        let candidates = vec![
            Candidate {
                account_id: high,
                company_id,
                score: 40,
            },
            Candidate {
                account_id: low,
                company_id,
                score: 40,
            },
            Candidate {
                account_id: Uuid::from_u128(3),
                company_id,
                score: 12,
            },
        ];
        assert_eq!(pick_best(&candidates).unwrap().account_id, low);
        assert!(pick_best(&[]).is_none());
    }
}
