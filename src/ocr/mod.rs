//! OCR Router and PDF Chunker: a uniform interface over pluggable OCR
//! engines, plus the bounded-memory strategy for documents too large to
//! OCR in one pass.

pub mod backend;
pub mod chunker;
pub mod cloud;
pub mod local;
pub mod router;

pub use backend::{OcrBackend, OcrBlock, OcrError, OcrOutcome, OcrPage, OcrTable};
pub use chunker::{Chunk, PdfChunker, SizingPolicy};
pub use cloud::CloudOcrClient;
pub use local::TesseractBackend;
pub use router::OcrRouter;
