//! Core data model: the shapes persisted and passed between pipeline
//! stages, and the invariants each type must uphold.

mod batch;
mod document_file;
mod payload;
mod progress_event;
mod scan_result;
mod template;
mod transaction;

pub use batch::{Batch, BatchStatus};
pub use document_file::{DocumentFile, DocumentType, FileStatus};
pub use payload::{
    FakturPajakPayload, InvoicePayload, LineItem, Party, Pph21Payload, Pph23Payload,
    RekeningKoranPayload, StructuredPayload,
};
pub use progress_event::{Phase, ProgressEvent, Topic};
pub use scan_result::{ScanResult, StageTimings};
pub use template::{FieldHint, Template};
pub use transaction::{dedupe_and_order, StandardizedTransaction};
