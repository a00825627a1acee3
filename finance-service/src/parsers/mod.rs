//! Statement file parsers.
//!
//! `parse_only` sniffs the format and turns raw upload bytes into candidate
//! transactions. Only a format-level mismatch is an error; individual rows
//! with unreadable fields come back with those fields empty.

pub mod delimited;
pub mod headers;
pub mod ofx;

use crate::error::FinanceError;
use crate::models::ParsedTransaction;

/// Bytes inspected by format detection.
const SNIFF_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Ofx,
    Unknown,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ofx => "ofx",
            Self::Unknown => "unknown",
        }
    }
}

pub fn detect_type(data: &[u8]) -> FileType {
    let head = &data[..data.len().min(SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_lowercase();

    if head.contains("<ofx") || head.contains("<stmttrn>") {
        FileType::Ofx
    } else if head.contains(',') || head.contains(';') || head.contains("date") {
        FileType::Csv
    } else {
        FileType::Unknown
    }
}

#[tracing::instrument(skip(data), fields(size = data.len()))]
pub fn parse_only(data: &[u8]) -> Result<Vec<ParsedTransaction>, FinanceError> {
    let file_type = detect_type(data);
    tracing::debug!(file_type = file_type.as_str(), "Detected statement format");

    match file_type {
        FileType::Csv => delimited::parse_csv(data),
        FileType::Ofx => Ok(ofx::parse_ofx(data)),
        FileType::Unknown => Err(FinanceError::UnsupportedFormat),
    }
}
