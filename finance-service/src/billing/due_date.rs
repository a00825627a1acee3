use crate::models::CardSchedule;
use chrono::{Datelike, Months, NaiveDate};

/// Number of days in `month`. A month outside 1-12 counts as 31 days.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1).map_or(31, days_in_month)
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day())
}

/// Invoice due date of a card purchase.
///
/// A purchase made after the reference day (the closing day, or the due day
/// when the card has no closing day) rolls into the next month's invoice.
/// The due day is clamped into the target month.
pub fn compute_card_due_date(
    transaction_date: NaiveDate,
    due_day: u32,
    closing_day: Option<u32>,
) -> NaiveDate {
    let reference = closing_day.filter(|d| *d > 0).unwrap_or(due_day);

    let Some(first) = transaction_date.with_day(1) else {
        return transaction_date;
    };
    let invoice_month = if transaction_date.day() > reference {
        first.checked_add_months(Months::new(1)).unwrap_or(first)
    } else {
        first
    };

    let day = due_day.clamp(1, days_in_month(invoice_month));
    invoice_month.with_day(day).unwrap_or(invoice_month)
}

/// The stored due date wins; otherwise derive it from the card schedule.
/// `None` when neither is available.
pub fn resolve_due_date(
    explicit: Option<NaiveDate>,
    transaction_date: NaiveDate,
    schedule: Option<&CardSchedule>,
) -> Option<NaiveDate> {
    explicit.or_else(|| {
        let schedule = schedule?;
        let due_day = schedule.due_day?;
        Some(compute_card_due_date(
            transaction_date,
            due_day,
            schedule.closing_day,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn purchase_after_closing_rolls_to_next_invoice() {
        assert_eq!(
            compute_card_due_date(date(2026, 2, 6), 10, Some(5)),
            date(2026, 3, 10)
        );
        assert_eq!(
            compute_card_due_date(date(2026, 2, 4), 10, Some(5)),
            date(2026, 2, 10)
        );
        // On the closing day itself the purchase stays in the current invoice.
        assert_eq!(
            compute_card_due_date(date(2026, 2, 5), 10, Some(5)),
            date(2026, 2, 10)
        );
    }

    #[test]
    fn due_day_is_the_reference_without_closing_day() {
        assert_eq!(compute_card_due_date(date(2026, 1, 15), 15, None), date(2026, 1, 15));
        assert_eq!(compute_card_due_date(date(2026, 1, 16), 15, None), date(2026, 2, 15));
    }

    #[test]
    fn clamps_to_end_of_month() {
        assert_eq!(compute_card_due_date(date(2026, 1, 25), 31, Some(20)), date(2026, 2, 28));
        assert_eq!(compute_card_due_date(date(2028, 1, 25), 31, Some(20)), date(2028, 2, 29));
        assert_eq!(compute_card_due_date(date(2026, 3, 25), 31, Some(20)), date(2026, 4, 30));
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        assert_eq!(last_day_of_month(2026, 2), 28);
        assert_eq!(last_day_of_month(2028, 2), 29);
        assert_eq!(last_day_of_month(2100, 2), 28);
        assert_eq!(last_day_of_month(2000, 2), 29);
        assert_eq!(last_day_of_month(2026, 11), 30);
        assert_eq!(last_day_of_month(2026, 12), 31);
    }

    #[test]
    fn rolls_over_year_end() {
        assert_eq!(compute_card_due_date(date(2025, 12, 28), 5, Some(25)), date(2026, 1, 5));
    }

    #[test]
    fn month_shift_matches_reference_day_for_every_day_of_the_year() {
        let mut day = date(2025, 1, 1);
        while day.year() == 2025 {
            for (due_day, closing_day) in [(10, Some(5)), (31, None), (1, Some(28)), (15, None)] {
                let due = compute_card_due_date(day, due_day, closing_day);
                let reference = closing_day.unwrap_or(due_day);
                let months_ahead =
                    (due.year() - day.year()) * 12 + due.month() as i32 - day.month() as i32;

                assert_eq!(months_ahead, if day.day() > reference { 1 } else { 0 });
                assert!(due.day() <= last_day_of_month(due.year(), due.month()));
                assert_eq!(due, compute_card_due_date(day, due_day, closing_day));
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn explicit_due_date_takes_precedence() {
        let schedule = CardSchedule {
            name: None,
            due_day: Some(10),
            closing_day: Some(5),
        };
        let explicit = date(2026, 5, 1);

        assert_eq!(
            resolve_due_date(Some(explicit), date(2026, 2, 6), Some(&schedule)),
            Some(explicit)
        );
        assert_eq!(
            resolve_due_date(None, date(2026, 2, 6), Some(&schedule)),
            Some(date(2026, 3, 10))
        );
    }

    #[test]
    fn unresolvable_without_due_day() {
        let schedule = CardSchedule {
            name: Some("Nubank".to_string()),
            due_day: None,
            closing_day: Some(5),
        };
        assert_eq!(resolve_due_date(None, date(2026, 2, 6), Some(&schedule)), None);
        assert_eq!(resolve_due_date(None, date(2026, 2, 6), None), None);
    }
}
