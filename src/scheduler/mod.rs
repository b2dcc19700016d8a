//! Batch Scheduler: admits batches, stores uploaded bytes, and drains a
//! FIFO work queue through a fixed-size worker pool
//! (pool/semaphore/`Arc<Mutex<_>>` queue), running as a long-lived pool
//! continuously fed by new submissions rather than draining one fixed
//! batch to completion.

mod admission;

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};
use uuid::Uuid;

pub use admission::{ArchiveManifestEntry, SubmissionFile};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::external::{ObjectStore, PersistenceStore};
use crate::models::{Batch, BatchStatus, DocumentFile, ScanResult};
use crate::notify::{Counters, NotificationFabric};
use crate::pipeline::{CancellationCheck, DocumentPipeline};

/// Fast, synchronous cancellation cache the pipeline's cancellation check
/// consults without awaiting the async persistence store. `cancel()`
/// writes through to both this cache and the durable `Batch` row.
struct BatchCancellationCheck {
    cancelled_batches: Arc<StdRwLock<HashSet<String>>>,
    batch_id: String,
}

impl CancellationCheck for BatchCancellationCheck {
    fn is_cancelled(&self) -> bool {
        self.cancelled_batches.read().unwrap().contains(&self.batch_id)
    }
}

pub struct BatchScheduler {
    config: Arc<Config>,
    persistence: Arc<dyn PersistenceStore>,
    object_store: Arc<dyn ObjectStore>,
    pipeline: Arc<DocumentPipeline>,
    notifier: Arc<NotificationFabric>,
    queue: Arc<Mutex<VecDeque<DocumentFile>>>,
    queue_notify: Arc<Notify>,
    cancelled_batches: Arc<StdRwLock<HashSet<String>>>,
    started: AtomicBool,
}

impl BatchScheduler {
    pub fn new(
        config: Arc<Config>,
        persistence: Arc<dyn PersistenceStore>,
        object_store: Arc<dyn ObjectStore>,
        pipeline: Arc<DocumentPipeline>,
        notifier: Arc<NotificationFabric>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            persistence,
            object_store,
            pipeline,
            notifier,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            queue_notify: Arc::new(Notify::new()),
            cancelled_batches: Arc::new(StdRwLock::new(HashSet::new())),
            started: AtomicBool::new(false),
        })
    }

    /// Start the fixed-size worker pool. Idempotent: calling this more
    /// than once only spawns workers the first time.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        for worker_id in 0..self.config.worker_pool_size {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.run_worker(worker_id).await });
        }
        info!(workers = self.config.worker_pool_size, "batch scheduler worker pool started");
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        loop {
            let file = {
                let mut queue = self.queue.lock().await;
                queue.pop_front()
            };
            let Some(file) = file else {
                tokio::select! {
                    _ = self.queue_notify.notified() => {}
                    _ = tokio::time::sleep(Duration::from_millis(500)) => {}
                }
                continue;
            };
            self.run_one(worker_id, file).await;
        }
    }

    async fn run_one(&self, worker_id: usize, file: DocumentFile) {
        let batch_id = file.batch_id.clone();
        let check = BatchCancellationCheck {
            cancelled_batches: self.cancelled_batches.clone(),
            batch_id: batch_id.clone(),
        };

        let outcome = match self.pipeline.process(file, &check).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(worker_id, error = %err, "pipeline returned an unexpected top-level error");
                return;
            }
        };

        let files_delta = u32::from(matches!(outcome.final_state, crate::pipeline::FileState::Done));
        let failed_delta = u32::from(matches!(outcome.final_state, crate::pipeline::FileState::Failed));
        let skipped_delta = u32::from(matches!(outcome.final_state, crate::pipeline::FileState::Skipped));

        let batch = match self
            .persistence
            .increment_batch_counters(&batch_id, files_delta, failed_delta, skipped_delta, outcome.pages_processed)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, batch_id, "failed to update batch counters");
                return;
            }
        };

        self.publish_file_phase(&batch_id, &outcome);

        if batch.is_settled() {
            self.settle_batch(batch).await;
        }
    }

    fn publish_file_phase(&self, batch_id: &str, outcome: &crate::pipeline::PipelineOutcome) {
        use crate::models::Phase;
        use crate::pipeline::FileState;

        let phase = match outcome.final_state {
            FileState::Done => Phase::FileDone,
            FileState::Failed => Phase::FileFailed,
            FileState::Skipped => Phase::FileSkipped,
            _ => Phase::FileExtracting,
        };
        let notifier = self.notifier.clone();
        let topic = crate::models::Topic::Batch(batch_id.to_string());
        tokio::spawn(async move {
            notifier.publish(topic, phase, Counters::default()).await;
        });
    }

    async fn settle_batch(&self, mut batch: Batch) {
        batch.status = if self.cancelled_batches.read().unwrap().contains(&batch.id) || batch.files_skipped > 0 {
            BatchStatus::Cancelled
        } else if batch.files_failed == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Partial
        };
        batch.completed_at = Some(chrono::Utc::now());

        let final_phase = match batch.status {
            BatchStatus::Completed => crate::models::Phase::BatchCompleted,
            BatchStatus::Partial => crate::models::Phase::BatchPartial,
            BatchStatus::Cancelled => crate::models::Phase::BatchCancelled,
            _ => crate::models::Phase::BatchPartial,
        };

        if let Err(err) = self.persistence.put_batch(batch.clone()).await {
            warn!(error = %err, batch_id = %batch.id, "failed to persist settled batch status");
        }

        let counters = Counters {
            files_processed: batch.files_processed,
            files_failed: batch.files_failed,
            pages_processed: batch.pages_processed,
            total_files: batch.total_files,
            total_pages: batch.total_pages,
        };
        self.notifier
            .publish(crate::models::Topic::Batch(batch.id.clone()), final_phase, counters)
            .await;
    }

    /// Admit a batch of plain (non-archive) files.
    pub async fn submit(&self, owner: &str, files: Vec<SubmissionFile>) -> CoreResult<Batch> {
        admission::validate_plain_submission(&self.config, &files)?;

        let batch_id = Uuid::new_v4().to_string();
        let declared_types = files.iter().map(|f| f.declared_type).collect::<Vec<_>>();
        let mut batch = Batch::new(batch_id.clone(), owner.to_string(), declared_types, files.len() as u32);
        batch.status = BatchStatus::Processing;
        self.persistence.put_batch(batch.clone()).await?;

        let mut queued = Vec::with_capacity(files.len());
        for file in files {
            if file.bytes.len() as u64 > self.config.max_file_bytes {
                return Err(CoreError::validation(format!(
                    "file {} exceeds max_file_bytes ({} > {})",
                    file.filename,
                    file.bytes.len(),
                    self.config.max_file_bytes
                )));
            }
            let content_hash = hash_bytes(&file.bytes);
            let file_id = Uuid::new_v4().to_string();
            let stored_path = format!("{batch_id}/{file_id}");
            self.object_store.write(&stored_path, &file.bytes).await?;

            let document_file = DocumentFile::new(
                file_id,
                batch_id.clone(),
                file.declared_type,
                file.filename,
                stored_path,
                file.bytes.len() as u64,
                content_hash,
            );
            self.persistence.put_file(document_file.clone()).await?;
            queued.push(document_file);
        }

        {
            let mut queue = self.queue.lock().await;
            queue.extend(queued);
        }
        self.queue_notify.notify_waiters();

        self.notifier
            .publish(
                crate::models::Topic::Batch(batch.id.clone()),
                crate::models::Phase::BatchSubmitted,
                Counters {
                    total_files: batch.total_files,
                    ..Default::default()
                },
            )
            .await;

        Ok(batch)
    }

    /// Admit an archive submission: every member must declare an
    /// allowed document type or the whole archive is rejected (the
    /// stricter tax-only/100-file policy).
    pub async fn submit_archive(
        &self,
        owner: &str,
        archive_bytes: Vec<u8>,
        manifest: Vec<ArchiveManifestEntry>,
    ) -> CoreResult<Batch> {
        let files = admission::extract_archive(&self.config, archive_bytes, manifest)?;
        self.submit(owner, files).await
    }

    pub async fn status(&self, batch_id: &str) -> CoreResult<Option<Batch>> {
        self.persistence.get_batch(batch_id).await
    }

    pub async fn list_batches(&self, owner: &str, limit: usize, offset: usize) -> CoreResult<Vec<Batch>> {
        self.persistence.list_batches(owner, limit, offset).await
    }

    /// Idempotent: cancelling an already-cancelled or already-terminal
    /// batch is a no-op, not an error.
    pub async fn cancel(&self, batch_id: &str) -> CoreResult<()> {
        let Some(mut batch) = self.persistence.get_batch(batch_id).await? else {
            return Err(CoreError::validation(format!("unknown batch {batch_id}")));
        };
        if batch.status.is_terminal() {
            return Ok(());
        }
        batch.cancel_requested = true;
        self.cancelled_batches.write().unwrap().insert(batch_id.to_string());
        self.persistence.put_batch(batch).await?;
        Ok(())
    }

    pub async fn results(&self, batch_id: &str) -> CoreResult<Vec<ScanResult>> {
        self.persistence.list_results_for_batch(batch_id).await
    }

    /// Apply a user correction to a persisted result's structured payload.
    /// Does not create a new result or touch the owning file's status.
    pub async fn update_result(&self, result_id: &str, patch: serde_json::Value) -> CoreResult<ScanResult> {
        let Some(mut result) = self.persistence.get_result(result_id).await? else {
            return Err(CoreError::validation(format!("unknown result {result_id}")));
        };
        result.apply_patch(patch)?;
        self.persistence.put_result(result.clone()).await?;
        Ok(result)
    }

    /// Restart recovery: re-queue files stuck in `processing` for a known
    /// owner. The in-memory reference `PersistenceStore` never survives a
    /// restart itself, so this is exercised against a durable store a
    /// production deployment supplies; there is no owner-agnostic listing
    /// in [`PersistenceStore`], so callers recover one owner at a time
    /// from their own index of known owners.
    pub async fn recover_owner(&self, owner: &str) -> CoreResult<usize> {
        let batches = self.persistence.list_batches(owner, usize::MAX, 0).await?;
        let mut requeued = 0;
        for batch in batches.into_iter().filter(|b| !b.status.is_terminal()) {
            let files = self.persistence.list_files(&batch.id).await?;
            let stuck: Vec<_> = files
                .into_iter()
                .filter(|f| f.status == crate::models::FileStatus::Processing)
                .collect();
            requeued += stuck.len();
            let mut queue = self.queue.lock().await;
            queue.extend(stuck);
        }
        if requeued > 0 {
            self.queue_notify.notify_waiters();
        }
        Ok(requeued)
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
