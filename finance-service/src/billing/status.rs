use crate::models::{EffectiveStatus, PaymentStatus};
use chrono::NaiveDate;

/// Paid stays paid; an unpaid item is overdue once `today` is past its due date.
pub fn effective_status(
    status: PaymentStatus,
    due_date: NaiveDate,
    today: NaiveDate,
) -> EffectiveStatus {
    match status {
        PaymentStatus::Paid => EffectiveStatus::Paid,
        PaymentStatus::Pending if due_date < today => EffectiveStatus::Overdue,
        PaymentStatus::Pending => EffectiveStatus::Pending,
    }
}

/// Status of a grouped payable: paid only when no member is pending.
pub fn group_status<I>(members: I, due_date: NaiveDate, today: NaiveDate) -> EffectiveStatus
where
    I: IntoIterator<Item = PaymentStatus>,
{
    let any_pending = members
        .into_iter()
        .any(|status| status == PaymentStatus::Pending);

    if any_pending {
        effective_status(PaymentStatus::Pending, due_date, today)
    } else {
        EffectiveStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn paid_ignores_due_date() {
        let today = date(2026, 3, 15);
        for due in [date(2020, 1, 1), today, date(2030, 1, 1)] {
            assert_eq!(effective_status(PaymentStatus::Paid, due, today), EffectiveStatus::Paid);
        }
    }

    #[test]
    fn pending_is_overdue_only_strictly_after_due_date() {
        let today = date(2026, 3, 15);
        assert_eq!(
            effective_status(PaymentStatus::Pending, date(2026, 3, 14), today),
            EffectiveStatus::Overdue
        );
        assert_eq!(
            effective_status(PaymentStatus::Pending, today, today),
            EffectiveStatus::Pending
        );
        assert_eq!(
            effective_status(PaymentStatus::Pending, date(2026, 3, 16), today),
            EffectiveStatus::Pending
        );
    }

    #[test]
    fn group_is_paid_only_when_every_member_is_paid() {
        let today = date(2026, 3, 15);
        let past = date(2026, 3, 10);

        assert_eq!(
            group_status([PaymentStatus::Paid, PaymentStatus::Paid], past, today),
            EffectiveStatus::Paid
        );
        assert_eq!(
            group_status([PaymentStatus::Paid, PaymentStatus::Pending], past, today),
            EffectiveStatus::Overdue
        );
        assert_eq!(
            group_status([PaymentStatus::Pending], date(2026, 4, 10), today),
            EffectiveStatus::Pending
        );
    }
}
