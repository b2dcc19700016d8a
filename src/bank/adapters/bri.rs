use crate::bank::adapter::{AccountIdentity, BankAdapter, BankAdapterError};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

use super::common::{extract_identity, parse_rows, AmountMode, ColumnLayout};

pub struct BriAdapter;

impl BankAdapter for BriAdapter {
    fn bank_name(&self) -> &'static str {
        "Bank Rakyat Indonesia"
    }

    fn bank_code(&self) -> &'static str {
        "bri"
    }

    fn detection_keywords(&self) -> &'static [&'static str] {
        &["bank rakyat indonesia", "pt bank rakyat indonesia", " bri "]
    }

    fn parse(&self, ocr: &OcrOutcome) -> Result<(Vec<StandardizedTransaction>, AccountIdentity), BankAdapterError> {
        let identity = extract_identity(&ocr.text, self.bank_name());
        // BRI's landscape export runs 14+ columns; only a handful carry
        // transaction data, the rest are branch/teller metadata we ignore.
        let layout = ColumnLayout {
            date_col: 0,
            desc_col: 5,
            amount: AmountMode::SeparateColumns { debit_col: 9, credit_col: 10 },
            balance_col: 11,
            ref_col: Some(3),
            date_formats: &["%d-%m-%Y"],
            min_columns: 12,
        };
        let transactions = parse_rows(ocr, &layout, self.bank_name(), &identity);
        if transactions.is_empty() {
            return Err(BankAdapterError::NoRowsMatched);
        }
        Ok((transactions, identity))
    }
}
