use crate::models::ParsedTransaction;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static BLOCK_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<STMTTRN>").expect("valid STMTTRN pattern"));
static BLOCK_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</STMTTRN>").expect("valid /STMTTRN pattern"));
static DTPOSTED: Lazy<Regex> = Lazy::new(|| tag_pattern("DTPOSTED"));
static TRNAMT: Lazy<Regex> = Lazy::new(|| tag_pattern("TRNAMT"));
static NAME: Lazy<Regex> = Lazy::new(|| tag_pattern("NAME"));
static MEMO: Lazy<Regex> = Lazy::new(|| tag_pattern("MEMO"));

fn tag_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?i)<{}>([^<\r\n]+)", tag)).expect("valid OFX tag pattern")
}

/// Extract one candidate per `<STMTTRN>` block. Fields a block lacks are
/// left empty; a block never fails on its own.
pub fn parse_ofx(data: &[u8]) -> Vec<ParsedTransaction> {
    let content = String::from_utf8_lossy(data);

    BLOCK_START
        .split(&content)
        .skip(1)
        .map(|block| {
            let block = BLOCK_END.split(block).next().unwrap_or(block);
            parse_block(block)
        })
        .collect()
}

fn parse_block(block: &str) -> ParsedTransaction {
    ParsedTransaction {
        name: tag_value(&NAME, block).or_else(|| tag_value(&MEMO, block)),
        amount: tag_value(&TRNAMT, block).and_then(|v| Decimal::from_str(&v.replace(',', ".")).ok()),
        date: tag_value(&DTPOSTED, block).and_then(|v| parse_posted_date(&v)),
        ..Default::default()
    }
}

fn tag_value(pattern: &Regex, block: &str) -> Option<String> {
    pattern
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `20250101120000[-3:BRT]` -> 2025-01-01: the first eight digits are the date.
fn parse_posted_date(value: &str) -> Option<NaiveDate> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = "OFXHEADER:100\n<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><BANKTRANLIST>\n\
        <STMTTRN>\n<TRNTYPE>DEBIT\n<DTPOSTED>20250101\n<TRNAMT>-123.45\n<NAME>Padaria\n</STMTTRN>\n\
        <stmttrn>\n<DTPOSTED>20250215093000[-3:BRT]\n<TRNAMT>2500.00\n<MEMO>Salario Fevereiro\n</stmttrn>\n\
        <STMTTRN>\n<DTPOSTED>2025\n<TRNAMT>abc\n</STMTTRN>\n\
        </BANKTRANLIST></STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";

    #[test]
    fn extracts_each_statement_block() {
        let parsed = parse_ofx(STATEMENT.as_bytes());
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0].date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(parsed[0].amount, Some(Decimal::from_str("-123.45").unwrap()));
        assert_eq!(parsed[0].name.as_deref(), Some("Padaria"));
    }

    #[test]
    fn falls_back_to_memo_and_handles_timestamps() {
        let parsed = parse_ofx(STATEMENT.as_bytes());

        assert_eq!(parsed[1].name.as_deref(), Some("Salario Fevereiro"));
        assert_eq!(parsed[1].date, NaiveDate::from_ymd_opt(2025, 2, 15));
        assert_eq!(parsed[1].amount, Some(Decimal::from_str("2500.00").unwrap()));
    }

    #[test]
    fn omits_unreadable_fields() {
        let parsed = parse_ofx(STATEMENT.as_bytes());

        assert_eq!(parsed[2], ParsedTransaction::default());
    }
}
