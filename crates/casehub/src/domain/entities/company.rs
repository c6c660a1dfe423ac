//! Company - Organisation owning fulfillment accounts

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Maximum cases per calendar month (None = unlimited)
    #[serde(default)]
    pub monthly_case_cap: Option<u32>,
    /// Cases counted in `cap_period`
    #[serde(default)]
    pub cases_this_month: u32,
    /// First day of the month `cases_this_month` belongs to
    ///
    /// `None` on companies that never took a case through the engine; the
    /// counter is then read as belonging to the current month.
    #[serde(default)]
    pub cap_period: Option<NaiveDate>,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// First day of the UTC calendar month containing `at`
pub fn month_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date.with_day(1).unwrap_or(date)
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_active: true,
            monthly_case_cap: None,
            cases_this_month: 0,
            cap_period: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_monthly_cap(mut self, cap: u32) -> Self {
        self.monthly_case_cap = Some(cap);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Cases counted against the cap in the month containing `at`
    pub fn cases_in_month(&self, at: DateTime<Utc>) -> u32 {
        match self.cap_period {
            Some(period) if period != month_start(at) => 0,
            _ => self.cases_this_month,
        }
    }

    /// Whether the company can take one more case in the month containing `at`
    pub fn under_monthly_cap(&self, at: DateTime<Utc>) -> bool {
        self.monthly_case_cap
            .map_or(true, |cap| self.cases_in_month(at) < cap)
    }

    /// Count one case in the month containing `at`, starting a new period if needed
    pub fn record_case(&mut self, at: DateTime<Utc>) {
        self.cases_this_month = self.cases_in_month(at) + 1;
        self.cap_period = Some(month_start(at));
    }

    /// Undo `record_case`; a count from an earlier month is left alone
    pub fn release_case(&mut self, at: DateTime<Utc>) {
        if self.cap_period.map_or(true, |period| period == month_start(at)) {
            self.cases_this_month = self.cases_this_month.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_start() {
        let at = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(month_start(at), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_cap_resets_in_a_new_month() {
        let march = Utc.with_ymd_and_hms(2026, 3, 20, 9, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

        let mut company = Company::new("Acme").with_monthly_cap(2);
        company.record_case(march);
        company.record_case(march);
        assert!(!company.under_monthly_cap(march));

        assert_eq!(company.cases_in_month(april), 0);
        assert!(company.under_monthly_cap(april));

        company.record_case(april);
        assert_eq!(company.cases_this_month, 1);
        assert_eq!(company.cap_period, Some(month_start(april)));
    }

    #[test]
    fn test_release_only_touches_current_period() {
        let march = Utc.with_ymd_and_hms(2026, 3, 20, 9, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();

        let mut company = Company::new("Acme").with_monthly_cap(5);
        company.record_case(march);
        company.record_case(march);

        company.release_case(april);
        assert_eq!(company.cases_this_month, 2);
        company.release_case(march);
        assert_eq!(company.cases_this_month, 1);
    }

    #[test]
    fn test_legacy_counter_without_period_counts_now() {
        let mut company = Company::new("Acme").with_monthly_cap(1);
        company.cases_this_month = 1;
        assert!(!company.under_monthly_cap(Utc::now()));
    }
}
