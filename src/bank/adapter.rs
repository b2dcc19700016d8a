//! Bank Adapter Registry: rule-based parsers over one known bank-statement
//! layout. A small trait (`detect`/`parse`) implemented by many
//! interchangeable backends, one per bank layout.

use thiserror::Error;

use crate::error::{CoreError, ErrorKind};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

#[derive(Debug, Error)]
pub enum BankAdapterError {
    #[error("no rows matched this adapter's expected layout")]
    NoRowsMatched,
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

impl From<BankAdapterError> for CoreError {
    fn from(err: BankAdapterError) -> Self {
        CoreError::with_source(ErrorKind::ExtractorParse, "bank adapter failure", err)
    }
}

/// Account identity fields an adapter can read off a statement header or
/// footer, independent of the transaction rows themselves.
#[derive(Debug, Clone, Default)]
pub struct AccountIdentity {
    pub bank_name: String,
    pub nomor_rekening: String,
    pub nama_pemegang: String,
}

/// One bank's rule-based statement parser. Each adapter advertises a bank
/// name, code, and detection keyword set; the registry
/// probes `detect` in a fixed order and hands the OCR outcome to the
/// first match's `parse`.
pub trait BankAdapter: Send + Sync {
    fn bank_name(&self) -> &'static str;
    fn bank_code(&self) -> &'static str;
    fn detection_keywords(&self) -> &'static [&'static str];

    /// Default detection: case-insensitive substring match against any
    /// configured keyword, anywhere in the OCR'd text. Adapters whose
    /// layout needs a stronger signal can override this.
    fn detect(&self, ocr_text: &str) -> bool {
        let haystack = ocr_text.to_lowercase();
        self.detection_keywords()
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()))
    }

    fn parse(&self, ocr: &OcrOutcome) -> Result<(Vec<StandardizedTransaction>, AccountIdentity), BankAdapterError>;
}
