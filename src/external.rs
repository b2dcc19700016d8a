//! Narrow trait interfaces onto collaborators this crate never implements
//! itself: the persistent relational store, object storage for uploads,
//! the auth/authorization policy engine, and the per-route rate limiter. The
//! core never reaches for a concrete database or HTTP client here — it
//! only calls these traits, so swapping the relational store for Postgres
//! or the object store for S3 never touches pipeline code.
//!
//! Two reference implementations are provided for tests and the demo
//! binary: an in-memory store and a filesystem object store. Production
//! deployments supply their own.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::models::{Batch, DocumentFile, ScanResult};

/// The relational store for Batch/DocumentFile/ScanResult rows. Batch
/// exclusively owns its DocumentFiles (cascade delete); DocumentFile
/// exclusively owns its ScanResult.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn put_batch(&self, batch: Batch) -> CoreResult<()>;
    async fn get_batch(&self, id: &str) -> CoreResult<Option<Batch>>;
    async fn list_batches(&self, owner: &str, limit: usize, offset: usize) -> CoreResult<Vec<Batch>>;

    async fn put_file(&self, file: DocumentFile) -> CoreResult<()>;
    async fn get_file(&self, id: &str) -> CoreResult<Option<DocumentFile>>;
    async fn list_files(&self, batch_id: &str) -> CoreResult<Vec<DocumentFile>>;

    /// Upsert semantics: if a result already exists for this document file,
    /// it is reconciled (overwritten) rather than duplicated — the pipeline
    /// relies on this for hash-keyed idempotence.
    async fn put_result(&self, result: ScanResult) -> CoreResult<()>;
    async fn get_result_for_file(&self, document_file_id: &str) -> CoreResult<Option<ScanResult>>;
    /// Looked up by the result's own id, as opposed to [`Self::get_result_for_file`]'s
    /// lookup by owning document file — used by the post-hoc correction route.
    async fn get_result(&self, result_id: &str) -> CoreResult<Option<ScanResult>>;
    async fn list_results_for_batch(&self, batch_id: &str) -> CoreResult<Vec<ScanResult>>;

    /// Atomic counter update. Returns the batch after the update so the
    /// caller can check settlement without a separate read.
    async fn increment_batch_counters(
        &self,
        batch_id: &str,
        files_delta: u32,
        failed_delta: u32,
        skipped_delta: u32,
        pages_delta: u32,
    ) -> CoreResult<Batch>;
}

/// Object storage for uploaded source files (and chunker scratch output,
/// when a deployment wants chunks durable across a crash). Paths are
/// opaque keys; the in-memory/filesystem impls below use plain paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read(&self, path: &str) -> CoreResult<Vec<u8>>;
    async fn write(&self, path: &str, bytes: &[u8]) -> CoreResult<()>;
    async fn delete(&self, path: &str) -> CoreResult<()>;
}

/// The external auth/authorization policy engine. The Notification
/// Fabric's handshake calls this with the bearer token read from the
/// session's first message.
#[async_trait]
pub trait AuthValidator: Send + Sync {
    async fn validate(&self, bearer_token: &str) -> CoreResult<String>;
}

/// Per-route request caps. The core consults this before admitting
/// expensive operations (batch submission, export); it does not
/// implement the limiting policy itself.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, route: &str, identity: &str) -> CoreResult<()>;
}

/// In-memory [`PersistenceStore`] for tests and the demo binary.
#[derive(Default)]
pub struct InMemoryStore {
    batches: RwLock<HashMap<String, Batch>>,
    files: RwLock<HashMap<String, DocumentFile>>,
    results_by_file: RwLock<HashMap<String, ScanResult>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn put_batch(&self, batch: Batch) -> CoreResult<()> {
        self.batches.write().await.insert(batch.id.clone(), batch);
        Ok(())
    }

    async fn get_batch(&self, id: &str) -> CoreResult<Option<Batch>> {
        Ok(self.batches.read().await.get(id).cloned())
    }

    async fn list_batches(&self, owner: &str, limit: usize, offset: usize) -> CoreResult<Vec<Batch>> {
        let mut batches: Vec<Batch> = self
            .batches
            .read()
            .await
            .values()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches.into_iter().skip(offset).take(limit).collect())
    }

    async fn put_file(&self, file: DocumentFile) -> CoreResult<()> {
        self.files.write().await.insert(file.id.clone(), file);
        Ok(())
    }

    async fn get_file(&self, id: &str) -> CoreResult<Option<DocumentFile>> {
        Ok(self.files.read().await.get(id).cloned())
    }

    async fn list_files(&self, batch_id: &str) -> CoreResult<Vec<DocumentFile>> {
        Ok(self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn put_result(&self, result: ScanResult) -> CoreResult<()> {
        self.results_by_file
            .write()
            .await
            .insert(result.document_file_id.clone(), result);
        Ok(())
    }

    async fn get_result_for_file(&self, document_file_id: &str) -> CoreResult<Option<ScanResult>> {
        Ok(self.results_by_file.read().await.get(document_file_id).cloned())
    }

    async fn get_result(&self, result_id: &str) -> CoreResult<Option<ScanResult>> {
        Ok(self.results_by_file.read().await.values().find(|r| r.id == result_id).cloned())
    }

    async fn list_results_for_batch(&self, batch_id: &str) -> CoreResult<Vec<ScanResult>> {
        let file_ids: Vec<String> = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.batch_id == batch_id)
            .map(|f| f.id.clone())
            .collect();
        let results = self.results_by_file.read().await;
        Ok(file_ids.iter().filter_map(|id| results.get(id).cloned()).collect())
    }

    async fn increment_batch_counters(
        &self,
        batch_id: &str,
        files_delta: u32,
        failed_delta: u32,
        skipped_delta: u32,
        pages_delta: u32,
    ) -> CoreResult<Batch> {
        let mut batches = self.batches.write().await;
        let batch = batches
            .get_mut(batch_id)
            .ok_or_else(|| CoreError::internal(format!("unknown batch {batch_id}")))?;
        batch.files_processed += files_delta;
        batch.files_failed += failed_delta;
        batch.files_skipped += skipped_delta;
        batch.pages_processed += pages_delta;
        Ok(batch.clone())
    }
}

/// Demo [`AuthValidator`] that accepts any non-empty bearer token and
/// echoes it back as the user id. Production deployments supply a real
/// policy engine; this exists only so the CLI/server demo has something
/// to wire against.
pub struct StaticTokenValidator;

#[async_trait]
impl AuthValidator for StaticTokenValidator {
    async fn validate(&self, bearer_token: &str) -> CoreResult<String> {
        if bearer_token.is_empty() {
            return Err(CoreError::validation("empty bearer token"));
        }
        Ok(bearer_token.to_string())
    }
}

/// Filesystem-backed [`ObjectStore`] rooted at a base directory.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn read(&self, path: &str) -> CoreResult<Vec<u8>> {
        tokio::fs::read(self.resolve(path)).await.map_err(CoreError::from)
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> CoreResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, bytes).await.map_err(CoreError::from)
    }

    async fn delete(&self, path: &str) -> CoreResult<()> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Batch, DocumentType, FakturPajakPayload, ScanResult, StageTimings, StructuredPayload};

    fn sample_result(id: &str, document_file_id: &str) -> ScanResult {
        ScanResult::new(
            id.into(),
            document_file_id.into(),
            "raw".into(),
            StructuredPayload::FakturPajak(FakturPajakPayload::default()),
            0.5,
            "cloud".into(),
            None,
            StageTimings::default(),
        )
    }

    #[tokio::test]
    async fn get_result_looks_up_by_result_id_not_file_id() {
        let store = InMemoryStore::new();
        store.put_result(sample_result("result-1", "file-1")).await.unwrap();

        let by_result_id = store.get_result("result-1").await.unwrap();
        assert_eq!(by_result_id.unwrap().document_file_id, "file-1");

        assert!(store.get_result("no-such-result").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn increment_batch_counters_tracks_skipped_files_separately() {
        let store = InMemoryStore::new();
        let batch = Batch::new("batch-1".into(), "owner".into(), vec![DocumentType::FakturPajak], 2);
        store.put_batch(batch).await.unwrap();

        let updated = store.increment_batch_counters("batch-1", 1, 0, 1, 3).await.unwrap();
        assert_eq!(updated.files_processed, 1);
        assert_eq!(updated.files_skipped, 1);
        assert_eq!(updated.pages_processed, 3);
        assert!(updated.is_settled());
    }
}
