//! Document Pipeline: the per-file state machine that runs one
//! [`DocumentFile`] from `queued` through OCR, dispatch-by-type
//! extraction, to a persisted [`ScanResult`]. Retry/backoff is a small
//! hand-rolled exponential-backoff helper rather than a dedicated backoff
//! crate.

mod retry;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::external::{ObjectStore, PersistenceStore};
use crate::hybrid::HybridBankProcessor;
use crate::llm::{builtin_template, SmartMapper};
use crate::models::{
    DocumentFile, DocumentType, FileStatus, Phase, RekeningKoranPayload, ScanResult, StageTimings, StructuredPayload,
    Topic,
};
use crate::notify::{Counters, NotificationFabric};
use crate::ocr::{OcrOutcome, OcrRouter, PdfChunker, SizingPolicy};

pub use retry::retry_with_backoff;

/// Phase tags for the state machine, distinct from [`crate::models::Phase`]
/// (the notification wire shape) so this enum can grow steps without
/// changing what's broadcast to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Queued,
    OcrRunning,
    Routed,
    Extracting,
    Persisting,
    Done,
    Failed,
    Skipped,
}

/// Outcome of running one file through the pipeline, reported back to the
/// scheduler so it can update batch counters and publish notifications.
pub struct PipelineOutcome {
    pub document_file_id: String,
    pub final_state: FileState,
    pub error_kind: Option<ErrorKind>,
    pub pages_processed: u32,
}

/// Checked at each safe boundary (before starting a file, and between
/// chunks) so a cancelled batch stops admitting new work without
/// interrupting work already committed to a chunk.
pub trait CancellationCheck: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

pub struct DocumentPipeline {
    config: Arc<Config>,
    object_store: Arc<dyn ObjectStore>,
    persistence: Arc<dyn PersistenceStore>,
    ocr_router: Arc<OcrRouter>,
    mapper: Arc<SmartMapper>,
    hybrid: Arc<HybridBankProcessor>,
    notifier: Arc<NotificationFabric>,
    /// Pre-flight thresholds deciding whether a file is OCR'd in one pass
    /// or split into chunks, enforced before the AI extractor ever sees it.
    sizing_policy: SizingPolicy,
    /// Bounds concurrent upstream OCR/LLM calls across the whole worker
    /// pool at `pool_size * inner_concurrency` permits, not just within
    /// one file.
    upstream_permits: Arc<Semaphore>,
}

impl DocumentPipeline {
    pub fn new(
        config: Arc<Config>,
        object_store: Arc<dyn ObjectStore>,
        persistence: Arc<dyn PersistenceStore>,
        ocr_router: Arc<OcrRouter>,
        mapper: Arc<SmartMapper>,
        hybrid: Arc<HybridBankProcessor>,
        notifier: Arc<NotificationFabric>,
        upstream_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            config,
            object_store,
            persistence,
            ocr_router,
            mapper,
            hybrid,
            notifier,
            sizing_policy: SizingPolicy::default(),
            upstream_permits,
        }
    }

    /// Run one file to completion. `cancel` is polled at the top and
    /// between chunks: a file already mid-chunk finishes that chunk and
    /// becomes `skipped` rather than persisting a partial result.
    #[instrument(skip(self, cancel), fields(file_id = %file.id, doc_type = %file.declared_type))]
    pub async fn process(&self, mut file: DocumentFile, cancel: &dyn CancellationCheck) -> CoreResult<PipelineOutcome> {
        if cancel.is_cancelled() {
            file.status = FileStatus::Skipped;
            self.persistence.put_file(file.clone()).await?;
            return Ok(PipelineOutcome {
                document_file_id: file.id,
                final_state: FileState::Skipped,
                error_kind: None,
                pages_processed: 0,
            });
        }

        file.status = FileStatus::Processing;
        self.persistence.put_file(file.clone()).await?;

        match self.run_inner(&mut file, cancel).await {
            Ok((payload, raw_text, confidence, engine_id, pages, timings)) => {
                self.persist_result(&file, raw_text, payload, confidence, engine_id, timings)
                    .await?;
                file.status = FileStatus::Done;
                file.page_count = Some(pages);
                self.persistence.put_file(file.clone()).await?;
                info!(pages, "file completed");
                Ok(PipelineOutcome {
                    document_file_id: file.id,
                    final_state: FileState::Done,
                    error_kind: None,
                    pages_processed: pages,
                })
            }
            Err(PipelineError::Cancelled) => {
                file.status = FileStatus::Skipped;
                self.persistence.put_file(file.clone()).await?;
                Ok(PipelineOutcome {
                    document_file_id: file.id,
                    final_state: FileState::Skipped,
                    error_kind: None,
                    pages_processed: 0,
                })
            }
            Err(PipelineError::Failed(err)) => {
                warn!(error = %err, kind = %err.kind, "file failed");
                file.status = FileStatus::Failed;
                file.error_kind = Some(err.kind);
                self.persistence.put_file(file.clone()).await?;
                Ok(PipelineOutcome {
                    document_file_id: file.id,
                    final_state: FileState::Failed,
                    error_kind: Some(err.kind),
                    pages_processed: 0,
                })
            }
        }
    }

    async fn run_inner(
        &self,
        file: &mut DocumentFile,
        cancel: &dyn CancellationCheck,
    ) -> Result<(StructuredPayload, String, f32, String, u32, StageTimings), PipelineError> {
        let started = Instant::now();

        // Materialize the object store's bytes to a real path: lopdf and
        // the OCR backends need filesystem access, while ObjectStore only
        // promises bytes.
        let bytes = self.object_store.read(&file.stored_path).await.map_err(PipelineError::from)?;
        let workdir = tempfile::tempdir().map_err(CoreError::from).map_err(PipelineError::from)?;
        let local_path = workdir.path().join(&file.id);
        tokio::fs::write(&local_path, &bytes).await.map_err(CoreError::from).map_err(PipelineError::from)?;

        let page_count = probe_page_count(&local_path).unwrap_or(1);
        let ocr_started = Instant::now();

        let (ocr, engine_id) = if self.sizing_policy.requires_chunking(page_count, 0, bytes.len()) {
            self.run_chunked(&local_path, page_count, &file.id, cancel).await?
        } else {
            let outcome = self.run_ocr_with_retry(&local_path).await?;
            let engine_id = outcome.engine_id.clone();
            (outcome, engine_id)
        };
        let ocr_ms = ocr_started.elapsed().as_millis() as u64;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let document_type = file.declared_type;
        let extraction_started = Instant::now();

        let (payload, confidence) = self.extract(document_type, &ocr).await;
        let extraction_ms = extraction_started.elapsed().as_millis() as u64;

        let timings = StageTimings {
            ocr_ms,
            extraction_ms,
            total_ms: started.elapsed().as_millis() as u64,
        };

        Ok((payload, ocr.text, confidence, engine_id, page_count, timings))
    }

    /// OCR a single in-memory document with transient-error retry.
    async fn run_ocr_with_retry(&self, path: &Path) -> Result<OcrOutcome, PipelineError> {
        let _permit = self.upstream_permits.acquire().await.map_err(|_| {
            PipelineError::Failed(CoreError::internal("upstream permit semaphore closed"))
        })?;
        retry_with_backoff(5, || async {
            self.ocr_router.process(path).await.map_err(CoreError::from)
        })
        .await
        .map_err(PipelineError::from)
    }

    /// Split into windowed chunks, OCR and extract each independently,
    /// then merge per the PDF Chunker's policy. Checked for cancellation
    /// between chunks, never mid-chunk. Publishes a page-progress event on
    /// the file's topic as each chunk completes, rather than only once the
    /// whole file is done.
    async fn run_chunked(
        &self,
        path: &Path,
        total_pages: u32,
        file_id: &str,
        cancel: &dyn CancellationCheck,
    ) -> Result<(OcrOutcome, String), PipelineError> {
        let chunker = PdfChunker::new(self.config.chunk_size, self.config.chunk_overlap);
        let chunks = chunker.chunk(path).map_err(PipelineError::from)?;

        let mut merged_text = String::new();
        let mut last_engine = String::new();
        let mut confidences = Vec::new();
        let mut cancelled = false;
        let mut pages_done = 0u32;

        for chunk in &chunks {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let outcome = match self.run_ocr_with_retry(&chunk.path).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    PdfChunker::cleanup(chunks).await.ok();
                    return Err(err);
                }
            };
            merged_text.push_str(&outcome.text);
            merged_text.push('\n');
            confidences.push(outcome.confidence);
            last_engine = outcome.engine_id.clone();

            let (from, to) = chunk.page_range;
            pages_done += to - from + 1;
            self.publish_chunk_progress(file_id, pages_done, total_pages);
        }

        PdfChunker::cleanup(chunks).await.map_err(PipelineError::from)?;

        if cancelled {
            return Err(PipelineError::Cancelled);
        }

        let avg_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        let merged = OcrOutcome {
            text: merged_text,
            pages: Vec::new(),
            confidence: avg_confidence,
            engine_id: last_engine.clone(),
            processing_time_ms: 0,
        };

        Ok((merged, last_engine))
    }

    /// Fire-and-forget progress publish on the file's own topic: a send
    /// error just means nobody is currently subscribed.
    fn publish_chunk_progress(&self, file_id: &str, pages_done: u32, total_pages: u32) {
        let notifier = self.notifier.clone();
        let topic = Topic::File(file_id.to_string());
        let counters = Counters {
            pages_processed: pages_done,
            total_pages: Some(total_pages),
            ..Default::default()
        };
        tokio::spawn(async move {
            notifier.publish(topic, Phase::FileOcrRunning, counters).await;
        });
    }

    /// Dispatch by declared type. Any extractor may fail; rather than
    /// failing the file, this falls back to a raw text record at
    /// `confidence=0` so the pipeline still persists something the user
    /// can inspect.
    async fn extract(&self, document_type: DocumentType, ocr: &OcrOutcome) -> (StructuredPayload, f32) {
        let _permit = self.upstream_permits.acquire().await.ok();
        if document_type.is_bank_statement() {
            match self.hybrid.process(ocr).await {
                Ok(result) => return (StructuredPayload::RekeningKoran(result.payload), result.confidence),
                Err(err) => {
                    warn!(error = %err, "hybrid bank processor failed, falling back to raw text");
                    return (StructuredPayload::RekeningKoran(RekeningKoranPayload::default()), 0.0);
                }
            }
        }

        let template = builtin_template(document_type);
        match self.mapper.map(&template, &ocr.text).await {
            Ok(payload) => (payload, ocr.confidence),
            Err(err) => {
                warn!(error = %err, "smart mapper failed, falling back to regex best-effort extraction");
                (crate::parsers::regex_fallback(document_type, &ocr.text), 0.0)
            }
        }
    }

    async fn persist_result(
        &self,
        file: &DocumentFile,
        raw_text: String,
        payload: StructuredPayload,
        confidence: f32,
        engine_id: String,
        timings: StageTimings,
    ) -> CoreResult<()> {
        // Hash-keyed idempotence: if a result already exists for this
        // file, reconcile text/payload/timings in place
        // rather than duplicating, preserving the existing result's id so
        // any user edits keyed off it are not orphaned.
        let existing = self.persistence.get_result_for_file(&file.id).await?;
        let id = existing.as_ref().map(|r| r.id.clone()).unwrap_or_else(|| Uuid::new_v4().to_string());

        let result = ScanResult::new(id, file.id.clone(), raw_text, payload, confidence, engine_id, None, timings);
        self.persistence.put_result(result).await
    }
}

fn probe_page_count(path: &Path) -> Option<u32> {
    PdfChunker::count_pages(path).ok()
}

enum PipelineError {
    Cancelled,
    Failed(CoreError),
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        PipelineError::Failed(err)
    }
}
