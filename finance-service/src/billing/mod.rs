//! Billing-cycle rules shared by persistence, aggregation and settlement.
//!
//! Every caller that needs a card transaction's invoice month goes through
//! [`resolve_due_date`], so the three views always agree.

mod due_date;
mod status;

pub use due_date::{compute_card_due_date, last_day_of_month, resolve_due_date};
pub use status::{effective_status, group_status};

use chrono::{Datelike, NaiveDate};

/// Optional month/year window. A month without a year matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl Period {
    pub fn new(month: Option<u32>, year: Option<i32>) -> Self {
        Self { month, year }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self {
            month: Some(date.month()),
            year: Some(date.year()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.month, self.year) {
            (Some(month), Some(year)) => date.month() == month && date.year() == year,
            (None, Some(year)) => date.year() == year,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_matching() {
        let march = Period::new(Some(3), Some(2026));
        assert!(march.contains(date(2026, 3, 31)));
        assert!(!march.contains(date(2025, 3, 10)));

        let year = Period::new(None, Some(2026));
        assert!(year.contains(date(2026, 12, 1)));
        assert!(!year.contains(date(2027, 1, 1)));

        // Month alone is not a usable window.
        let month_only = Period::new(Some(3), None);
        assert!(month_only.contains(date(1999, 7, 4)));
    }
}
