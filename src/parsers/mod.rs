//! Document Parsers: `regex`-based low-cost fallback field extraction over
//! Indonesian tax document fields. Best-effort only — these never raise an
//! error, they just fill in what they can find and leave the rest at the
//! zero value.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{
    DocumentType, FakturPajakPayload, InvoicePayload, Party, Pph21Payload, Pph23Payload,
    RekeningKoranPayload, StructuredPayload,
};

fn npwp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{2}\.\d{3}\.\d{3}\.\d-\d{3}\.\d{3}\b").unwrap())
}

fn rupiah_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Rp\.?\s?([\d.]+,\d{2}|\d+)").unwrap())
}

fn id_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap())
}

/// Extract the first NPWP (Indonesian taxpayer ID, `NN.NNN.NNN.N-NNN.NNN`)
/// found in `text`, if any.
pub fn extract_npwp(text: &str) -> Option<String> {
    npwp_re().find(text).map(|m| m.as_str().to_string())
}

/// Extract the first `Rp`-prefixed rupiah amount, converting the
/// locale's `1.000,00` thousands/decimal separators into a [`Decimal`].
pub fn extract_rupiah_amount(text: &str) -> Option<Decimal> {
    let raw = rupiah_amount_re().captures(text)?.get(1)?.as_str();
    parse_rupiah_decimal(raw)
}

/// Parse a rupiah-formatted number (`.` thousands separator, `,` decimal
/// separator) into a [`Decimal`]. Returns `None` on malformed input
/// rather than guessing.
pub fn parse_rupiah_decimal(raw: &str) -> Option<Decimal> {
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.replace('.', "")
    };
    normalized.parse::<Decimal>().ok()
}

/// Extract the first `DD/MM/YYYY` or `DD-MM-YYYY` date found in `text`.
pub fn extract_id_date(text: &str) -> Option<chrono::NaiveDate> {
    let caps = id_date_re().captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(year, month, day)
}

/// Best-effort structured extraction straight from OCR text, used as a
/// last-resort fallback when the Smart Mapper is unavailable or fails.
/// Never fails; fields it cannot find are left at their zero value.
pub fn regex_fallback(document_type: DocumentType, ocr_text: &str) -> StructuredPayload {
    let npwp = extract_npwp(ocr_text).unwrap_or_default();
    let amount = extract_rupiah_amount(ocr_text).unwrap_or(Decimal::ZERO);
    let date = extract_id_date(ocr_text);

    match document_type {
        DocumentType::FakturPajak => StructuredPayload::FakturPajak(FakturPajakPayload {
            seller: Party { npwp: npwp.clone(), ..Default::default() },
            invoice_issue_date: date,
            total: amount,
            ..Default::default()
        }),
        DocumentType::Pph21 => StructuredPayload::Pph21(Pph21Payload {
            identitas_pemotong: Party { npwp: npwp.clone(), ..Default::default() },
            dokumen_tanggal: date,
            pph: amount,
            ..Default::default()
        }),
        DocumentType::Pph23 => StructuredPayload::Pph23(Pph23Payload {
            pemotong_npwp: npwp.clone(),
            dokumen_tanggal: date,
            pph: amount,
            ..Default::default()
        }),
        DocumentType::Invoice => StructuredPayload::Invoice(InvoicePayload {
            vendor: Party { npwp: npwp.clone(), ..Default::default() },
            total: amount,
            ..Default::default()
        }),
        DocumentType::RekeningKoran => StructuredPayload::RekeningKoran(RekeningKoranPayload {
            saldo_akhir: amount,
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_npwp_in_standard_format() {
        let text = "NPWP Penjual: 01.234.567.8-912.000 lainnya";
        assert_eq!(extract_npwp(text).as_deref(), Some("01.234.567.8-912.000"));
    }

    #[test]
    fn parses_rupiah_locale_amount() {
        assert_eq!(extract_rupiah_amount("Total: Rp 1.250.000,50"), Decimal::from_str_exact("1250000.50").ok());
    }

    #[test]
    fn parses_indonesian_date() {
        let date = extract_id_date("Tanggal: 15/03/2024").unwrap();
        assert_eq!(date.to_string(), "2024-03-15");
    }

    #[test]
    fn regex_fallback_never_panics_on_empty_text() {
        let payload = regex_fallback(DocumentType::Invoice, "");
        assert!(matches!(payload, StructuredPayload::Invoice(_)));
    }
}
