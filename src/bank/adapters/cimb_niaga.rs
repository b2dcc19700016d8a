use crate::bank::adapter::{AccountIdentity, BankAdapter, BankAdapterError};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

use super::common::{extract_identity, parse_rows, AmountMode, ColumnLayout};

pub struct CimbNiagaAdapter;

impl BankAdapter for CimbNiagaAdapter {
    fn bank_name(&self) -> &'static str {
        "CIMB Niaga"
    }

    fn bank_code(&self) -> &'static str {
        "cimb_niaga"
    }

    fn detection_keywords(&self) -> &'static [&'static str] {
        &["cimb niaga", "pt bank cimb niaga"]
    }

    fn parse(&self, ocr: &OcrOutcome) -> Result<(Vec<StandardizedTransaction>, AccountIdentity), BankAdapterError> {
        let identity = extract_identity(&ocr.text, self.bank_name());
        let layout = ColumnLayout {
            date_col: 0,
            desc_col: 2,
            amount: AmountMode::SingleWithFlagColumn { amount_col: 3, flag_col: 4 },
            balance_col: 5,
            ref_col: Some(1),
            date_formats: &["%d/%m/%Y"],
            min_columns: 6,
        };
        let transactions = parse_rows(ocr, &layout, self.bank_name(), &identity);
        if transactions.is_empty() {
            return Err(BankAdapterError::NoRowsMatched);
        }
        Ok((transactions, identity))
    }
}
