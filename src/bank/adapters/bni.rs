use crate::bank::adapter::{AccountIdentity, BankAdapter, BankAdapterError};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

use super::common::{extract_identity, parse_rows, AmountMode, ColumnLayout};

pub struct BniAdapter;

impl BankAdapter for BniAdapter {
    fn bank_name(&self) -> &'static str {
        "Bank Negara Indonesia"
    }

    fn bank_code(&self) -> &'static str {
        "bni"
    }

    fn detection_keywords(&self) -> &'static [&'static str] {
        &["bank negara indonesia", "pt bank negara indonesia", " bni "]
    }

    fn parse(&self, ocr: &OcrOutcome) -> Result<(Vec<StandardizedTransaction>, AccountIdentity), BankAdapterError> {
        let identity = extract_identity(&ocr.text, self.bank_name());
        let layout = ColumnLayout {
            date_col: 0,
            desc_col: 1,
            amount: AmountMode::SeparateColumns { debit_col: 3, credit_col: 4 },
            balance_col: 5,
            ref_col: Some(2),
            date_formats: &["%d/%m/%y", "%d/%m/%Y"],
            min_columns: 6,
        };
        let transactions = parse_rows(ocr, &layout, self.bank_name(), &identity);
        if transactions.is_empty() {
            return Err(BankAdapterError::NoRowsMatched);
        }
        Ok((transactions, identity))
    }
}
