use crate::bank::adapter::{AccountIdentity, BankAdapter, BankAdapterError};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

use super::common::{extract_identity, parse_rows, AmountMode, ColumnLayout};

pub struct PermataAdapter;

impl BankAdapter for PermataAdapter {
    fn bank_name(&self) -> &'static str {
        "Permata Bank"
    }

    fn bank_code(&self) -> &'static str {
        "permata"
    }

    fn detection_keywords(&self) -> &'static [&'static str] {
        &["permatabank", "permata bank", "pt bank permata"]
    }

    fn parse(&self, ocr: &OcrOutcome) -> Result<(Vec<StandardizedTransaction>, AccountIdentity), BankAdapterError> {
        let identity = extract_identity(&ocr.text, self.bank_name());
        let layout = ColumnLayout {
            date_col: 0,
            desc_col: 1,
            amount: AmountMode::SeparateColumns { debit_col: 2, credit_col: 3 },
            balance_col: 4,
            ref_col: None,
            date_formats: &["%d/%m/%Y", "%d-%m-%Y"],
            min_columns: 5,
        };
        let transactions = parse_rows(ocr, &layout, self.bank_name(), &identity);
        if transactions.is_empty() {
            return Err(BankAdapterError::NoRowsMatched);
        }
        Ok((transactions, identity))
    }
}
