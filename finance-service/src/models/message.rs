use super::{PaymentMethod, TransactionCategory, TransactionType};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de};
use uuid::Uuid;

/// Loosely-typed candidate produced by a file parser. Any field the source
/// row did not carry (or carried in an unreadable form) is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTransaction {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<TransactionCategory>,
    pub payment_method: Option<PaymentMethod>,
}

/// Queue payload and pipeline accumulator.
///
/// Each stage takes the message by value and returns the enriched copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "deserialize_message_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TransactionCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_job_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

impl TransactionMessage {
    pub fn from_parsed(
        user_id: &str,
        parsed: ParsedTransaction,
        import_job_id: Option<Uuid>,
        credit_card_id: Option<Uuid>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: parsed.name,
            amount: parsed.amount,
            date: parsed.date,
            transaction_type: parsed.transaction_type,
            category: parsed.category,
            payment_method: parsed.payment_method,
            import_job_id,
            credit_card_id,
            ..Default::default()
        }
    }
}

/// Read a calendar date from `YYYY-MM-DD` or from an RFC 3339 timestamp,
/// keeping the date as written in the timestamp's own offset.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn deserialize_message_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) => parse_calendar_date(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rehydrates_timestamp_dates() {
        let json = r#"{"userId":"user_1","name":"Padaria","amount":"5.00","date":"2025-01-01T03:00:00.000Z"}"#;
        let message: TransactionMessage = serde_json::from_str(json).unwrap();

        assert_eq!(message.date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(message.amount, Some(Decimal::from_str("5.00").unwrap()));
    }

    #[test]
    fn accepts_numeric_amounts_and_missing_fields() {
        let json = r#"{"userId":"user_1","amount":-12.5,"type":"EXPENSE"}"#;
        let message: TransactionMessage = serde_json::from_str(json).unwrap();

        assert_eq!(message.amount, Some(Decimal::from_str("-12.5").unwrap()));
        assert_eq!(message.transaction_type, Some(TransactionType::Expense));
        assert!(message.name.is_none());
        assert!(message.date.is_none());
    }

    #[test]
    fn rejects_unreadable_dates() {
        let json = r#"{"userId":"user_1","date":"yesterday"}"#;
        assert!(serde_json::from_str::<TransactionMessage>(json).is_err());
    }

    #[test]
    fn omits_absent_fields_when_serialized() {
        let message = TransactionMessage {
            user_id: "user_1".to_string(),
            name: Some("Padaria".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json, serde_json::json!({"userId": "user_1", "name": "Padaria"}));
    }
}
