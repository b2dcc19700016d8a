use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// The closed set of document types this system understands. Unknown
/// filenames/declared types never get a speculative guess here — the
/// Document Pipeline fails them fast as `unsupported_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    FakturPajak,
    Pph21,
    Pph23,
    Invoice,
    RekeningKoran,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::FakturPajak => "faktur_pajak",
            DocumentType::Pph21 => "pph21",
            DocumentType::Pph23 => "pph23",
            DocumentType::Invoice => "invoice",
            DocumentType::RekeningKoran => "rekening_koran",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "faktur_pajak" => Some(DocumentType::FakturPajak),
            "pph21" => Some(DocumentType::Pph21),
            "pph23" => Some(DocumentType::Pph23),
            "invoice" => Some(DocumentType::Invoice),
            "rekening_koran" => Some(DocumentType::RekeningKoran),
            _ => None,
        }
    }

    /// Whether archive-expanded submissions may include this type:
    /// archive admission is tax-document-only.
    pub fn archive_eligible(self) -> bool {
        !matches!(self, DocumentType::RekeningKoran)
    }

    /// Bank statements go through the hybrid adapter+mapper path; every
    /// other type goes straight to the Smart Mapper.
    pub fn is_bank_statement(self) -> bool {
        matches!(self, DocumentType::RekeningKoran)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-file processing state. Transitions are monotonic except
/// `Queued -> Skipped` on batch cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Queued,
    Processing,
    Done,
    Failed,
    Skipped,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Done | FileStatus::Failed | FileStatus::Skipped)
    }
}

/// One file admitted into a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFile {
    pub id: String,
    pub batch_id: String,
    pub declared_type: DocumentType,
    pub original_filename: String,
    pub stored_path: String,
    pub size_bytes: u64,
    pub content_hash: String,
    pub page_count: Option<u32>,
    pub status: FileStatus,
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
}

impl DocumentFile {
    pub fn new(
        id: String,
        batch_id: String,
        declared_type: DocumentType,
        original_filename: String,
        stored_path: String,
        size_bytes: u64,
        content_hash: String,
    ) -> Self {
        Self {
            id,
            batch_id,
            declared_type,
            original_filename,
            stored_path,
            size_bytes,
            content_hash,
            page_count: None,
            status: FileStatus::Queued,
            error_kind: None,
            created_at: Utc::now(),
        }
    }
}
