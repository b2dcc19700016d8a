//! Exporter Factory: renders persisted [`ScanResult`]s into spreadsheets
//! (one layout per document type, `rust_xlsxwriter`) and HTML reports
//! (`askama`). A format enum dispatched to a type-specific writer, over
//! typed columns rather than flat CSV/JSON rows.

mod report;
mod spreadsheet;

use thiserror::Error;

use crate::error::{CoreError, ErrorKind};
use crate::models::{DocumentType, ScanResult};

pub use report::render_html_report;
pub use spreadsheet::write_workbook;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Html,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no results to export")]
    Empty,
    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("report rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl From<ExportError> for CoreError {
    fn from(err: ExportError) -> Self {
        let kind = match &err {
            ExportError::Empty => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        };
        CoreError::with_source(kind, "export failed", err)
    }
}

/// Export a single result as one of the supported formats.
pub fn export_single(result: &ScanResult, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    export_batch(std::slice::from_ref(result), format)
}

/// Export a batch's worth of results, grouped into one worksheet per
/// document type present, or a single combined HTML report.
pub fn export_batch(results: &[ScanResult], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    if results.is_empty() {
        return Err(ExportError::Empty);
    }
    match format {
        ExportFormat::Xlsx => write_workbook(results),
        ExportFormat::Html => render_html_report(results).map(String::into_bytes),
    }
}

/// Group results by their payload's document type, preserving first-seen
/// order — used by both exporters to decide worksheet/section order.
pub(crate) fn group_by_type(results: &[ScanResult]) -> Vec<(DocumentType, Vec<&ScanResult>)> {
    let mut groups: Vec<(DocumentType, Vec<&ScanResult>)> = Vec::new();
    for result in results {
        let doc_type = result.payload.document_type();
        match groups.iter_mut().find(|(t, _)| *t == doc_type) {
            Some((_, bucket)) => bucket.push(result),
            None => groups.push((doc_type, vec![result])),
        }
    }
    groups
}
