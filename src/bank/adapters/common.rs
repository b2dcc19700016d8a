//! Shared table-parsing helpers used by every bank-specific adapter, so
//! the 11 layouts differ only in column positions and detection
//! keywords, not in boilerplate row-walking and number parsing.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::StandardizedTransaction;
use crate::ocr::{OcrOutcome, OcrTable};

use super::super::adapter::AccountIdentity;

/// How a table exposes debit/credit for one row.
pub enum AmountMode {
    /// Separate debit and credit columns; at most one is non-empty per row.
    SeparateColumns { debit_col: usize, credit_col: usize },
    /// One amount column plus a sibling D/C flag column: debit vs credit
    /// is selected by that sibling column's value.
    SingleWithFlagColumn { amount_col: usize, flag_col: usize },
}

pub struct ColumnLayout {
    pub date_col: usize,
    pub desc_col: usize,
    pub amount: AmountMode,
    pub balance_col: usize,
    pub ref_col: Option<usize>,
    pub date_formats: &'static [&'static str],
    /// Rows with fewer columns than this are treated as a continuation
    /// line of the previous row's description.
    pub min_columns: usize,
}

/// Parse `rupiah`-locale number formats: `1.000,00` (dot thousands, comma
/// decimal) as well as plain `1000.00`.
/// A trailing `D`/`C`/`K` letter (debit/credit/kredit) is treated as a
/// sign flag when present directly on the cell.
pub fn parse_rupiah(raw: &str) -> Option<(Decimal, Option<char>)> {
    let mut s = raw.trim().replace("Rp", "").replace("RP", "").trim().to_string();
    if s.is_empty() || s == "-" {
        return Some((Decimal::ZERO, None));
    }

    let mut flag = None;
    if let Some(last) = s.chars().last() {
        if matches!(last.to_ascii_uppercase(), 'D' | 'C' | 'K') {
            flag = Some(last.to_ascii_uppercase());
            s.pop();
            s = s.trim().to_string();
        }
    }

    // `1.234.567,89` -> strip thousands dots, decimal comma becomes a dot.
    // A lone `.` with exactly 2 trailing digits is already a decimal point
    // (plain `1000.00`), so only rewrite when a comma is present.
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.replace(',', "")
    };

    normalized.parse::<Decimal>().ok().map(|v| (v, flag))
}

pub fn parse_date_multi(raw: &str, formats: &[&str]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    formats.iter().find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Pull every table row out of every page, flattening chunk boundaries
/// (the chunker hands adapters one PDF window at a time; within a window
/// tables are already page-ordered).
fn all_rows(ocr: &OcrOutcome) -> Vec<&Vec<String>> {
    ocr.pages
        .iter()
        .flat_map(|p| p.tables.iter())
        .flat_map(|t: &OcrTable| t.rows.iter())
        .collect()
}

/// Parse a uniform statement table into canonical transactions, merging
/// continuation rows (rows shorter than `layout.min_columns`) onto the
/// previous row's description.
pub fn parse_rows(
    ocr: &OcrOutcome,
    layout: &ColumnLayout,
    bank_name: &str,
    identity: &AccountIdentity,
) -> Vec<StandardizedTransaction> {
    let rows = all_rows(ocr);
    let mut out: Vec<StandardizedTransaction> = Vec::new();
    let mut sequence = 0u32;

    for row in rows {
        if row.len() < layout.min_columns {
            if let Some(last) = out.last_mut() {
                if let Some(cell) = row.first() {
                    last.description.push(' ');
                    last.description.push_str(cell.trim());
                }
            }
            continue;
        }

        let Some(date) = row.get(layout.date_col).and_then(|c| parse_date_multi(c, layout.date_formats)) else {
            continue;
        };

        let (debit, credit) = match &layout.amount {
            AmountMode::SeparateColumns { debit_col, credit_col } => {
                let debit = row.get(*debit_col).and_then(|c| parse_rupiah(c)).map(|(v, _)| v).unwrap_or(Decimal::ZERO);
                let credit = row.get(*credit_col).and_then(|c| parse_rupiah(c)).map(|(v, _)| v).unwrap_or(Decimal::ZERO);
                (debit, credit)
            }
            AmountMode::SingleWithFlagColumn { amount_col, flag_col } => {
                let amount = row
                    .get(*amount_col)
                    .and_then(|c| parse_rupiah(c))
                    .map(|(v, _)| v)
                    .unwrap_or(Decimal::ZERO);
                let flag = row.get(*flag_col).map(|c| c.trim().to_uppercase());
                match flag.as_deref() {
                    Some("D") => (amount, Decimal::ZERO),
                    Some("C") | Some("K") => (Decimal::ZERO, amount),
                    _ => (amount, Decimal::ZERO),
                }
            }
        };

        let balance = row.get(layout.balance_col).and_then(|c| parse_rupiah(c)).map(|(v, _)| v).unwrap_or(Decimal::ZERO);
        let description = row.get(layout.desc_col).cloned().unwrap_or_default().trim().to_string();
        let reference_number = layout.ref_col.and_then(|c| row.get(c)).cloned().unwrap_or_default();

        out.push(StandardizedTransaction {
            transaction_date: date,
            posting_date: None,
            effective_date: None,
            description,
            transaction_type: if debit > Decimal::ZERO { "debit".to_string() } else { "credit".to_string() },
            reference_number,
            debit,
            credit,
            balance,
            branch: String::new(),
            additional_info: String::new(),
            bank_name: bank_name.to_string(),
            account_number: identity.nomor_rekening.clone(),
            account_holder: identity.nama_pemegang.clone(),
            source_sequence: sequence,
        });
        sequence += 1;
    }

    out
}

/// Best-effort account identity extraction from free OCR text (statement
/// headers are prose, not tables).
pub fn extract_identity(ocr_text: &str, bank_name: &str) -> AccountIdentity {
    let account_re = Regex::new(r"(?i)(?:no\.?\s*rekening|account\s*no\.?|nomor\s*rekening)\s*[:\-]?\s*([0-9.\-]{5,})").unwrap();
    let holder_re = Regex::new(r"(?i)(?:nama|account\s*name)\s*[:\-]?\s*([A-Za-z .,'\-]{3,60})").unwrap();

    let nomor_rekening = account_re
        .captures(ocr_text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();
    let nama_pemegang = holder_re
        .captures(ocr_text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    AccountIdentity {
        bank_name: bank_name.to_string(),
        nomor_rekening,
        nama_pemegang,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indonesian_thousands_and_decimal() {
        let (value, flag) = parse_rupiah("1.234.567,89").unwrap();
        assert_eq!(value.to_string(), "1234567.89");
        assert_eq!(flag, None);
    }

    #[test]
    fn parses_plain_decimal() {
        let (value, _) = parse_rupiah("1000.50").unwrap();
        assert_eq!(value.to_string(), "1000.50");
    }

    #[test]
    fn strips_trailing_dc_flag() {
        let (value, flag) = parse_rupiah("50.000,00 D").unwrap();
        assert_eq!(value.to_string(), "50000.00");
        assert_eq!(flag, Some('D'));
    }

    #[test]
    fn empty_or_dash_is_zero() {
        assert_eq!(parse_rupiah("-").unwrap().0, Decimal::ZERO);
        assert_eq!(parse_rupiah("").unwrap().0, Decimal::ZERO);
    }
}
