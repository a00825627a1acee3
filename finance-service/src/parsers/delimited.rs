use super::headers::{TransactionField, map_headers};
use crate::error::FinanceError;
use crate::models::{
    ParsedTransaction, PaymentMethod, TransactionCategory, TransactionType, parse_calendar_date,
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;

const BOM: char = '\u{feff}';

/// Parse a delimited statement export. The first record is the header row.
pub fn parse_csv(data: &[u8]) -> Result<Vec<ParsedTransaction>, FinanceError> {
    let content = String::from_utf8_lossy(data);
    let content = content.trim_start_matches(BOM);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(detect_delimiter(content))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| {
        tracing::debug!(error = %e, "Unreadable CSV header row");
        FinanceError::UnsupportedFormat
    })?;
    let fields = map_headers(headers.iter());

    let mut transactions = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            tracing::debug!(error = %e, "Malformed CSV record");
            FinanceError::UnsupportedFormat
        })?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut transaction = ParsedTransaction::default();
        for (field, value) in fields.iter().zip(record.iter()) {
            if let Some(field) = field {
                apply_cell(&mut transaction, *field, value);
            }
        }
        transactions.push(transaction);
    }

    Ok(transactions)
}

/// Semicolon exports are common for decimal-comma locales; use `;` when the
/// header line has more of them than commas.
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

fn apply_cell(transaction: &mut ParsedTransaction, field: TransactionField, raw: &str) {
    let value = raw.trim();
    if value.is_empty() {
        return;
    }

    match field {
        TransactionField::Name => transaction.name = Some(value.to_string()),
        TransactionField::Amount => {
            if let Some(amount) = parse_amount(value) {
                transaction.amount = Some(amount);
            }
        }
        TransactionField::Date => {
            if let Some(date) = parse_date(value) {
                transaction.date = Some(date);
            }
        }
        TransactionField::Type => {
            if let Some(t) = TransactionType::parse(value) {
                transaction.transaction_type = Some(t);
            }
        }
        TransactionField::Category => {
            if let Some(c) = TransactionCategory::parse(value) {
                transaction.category = Some(c);
            }
        }
        TransactionField::PaymentMethod => {
            if let Some(m) = PaymentMethod::parse(value) {
                transaction.payment_method = Some(m);
            }
        }
    }
}

/// `"R$ 1.234,56"` -> `1234.56`. Dots are thousands separators, the first
/// comma is the decimal mark.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let cleaned = value.replace("R$", "").replace('.', "").replacen(',', ".", 1);
    Decimal::from_str(cleaned.trim()).ok()
}

/// Slash dates are day/month/year; anything else is read as ISO.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.contains('/') {
        let mut parts = value.split('/').rev().map(|p| p.trim().parse::<u32>().ok());
        let year = parts.next()??;
        let month = parts.next()??;
        let day = parts.next()??;
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    } else {
        parse_calendar_date(value)
    }
}
