//! OCR backend abstraction: a uniform engine trait covering both "one
//! local engine picked per source" and "cloud engine with an ordered
//! local fallback list".

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CoreError, ErrorKind};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),
    #[error("ocr failed: {0}")]
    OcrFailed(String),
    #[error("upstream transient failure: {0}")]
    Transient(String),
    #[error("upstream rejected request: {0}")]
    Permanent(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::Transient(_) => ErrorKind::UpstreamTransient,
            OcrError::Permanent(_) => ErrorKind::UpstreamPermanent,
            OcrError::BackendNotAvailable(_) => ErrorKind::Resource,
            OcrError::OcrFailed(_) | OcrError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<OcrError> for CoreError {
    fn from(err: OcrError) -> Self {
        let kind = err.kind();
        CoreError::with_source(kind, "ocr backend failure", err)
    }
}

/// One detected table on a page, as row-major cell text (the cloud engine
/// returns table cell structure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrTable {
    pub rows: Vec<Vec<String>>,
}

/// A text block with a per-line confidence, as the cloud engine reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrPage {
    pub page_number: u32,
    pub text: String,
    pub tables: Vec<OcrTable>,
    pub blocks: Vec<OcrBlock>,
}

/// The uniform OCR result shape shared by every engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    pub pages: Vec<OcrPage>,
    pub confidence: f32,
    pub engine_id: String,
    pub processing_time_ms: u64,
}

/// One OCR engine: the cloud Document-AI-compatible service, or a local
/// fallback. A local backend need only guarantee text + approximate
/// confidence.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    fn engine_id(&self) -> &'static str;
    async fn is_available(&self) -> bool;
    async fn run(&self, path: &Path) -> Result<OcrOutcome, OcrError>;
}
