use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document_file::DocumentType;

/// Terminal and in-flight states of a [`Batch`].
///
/// Invariants (enforced by the scheduler, not by this type): `Completed`
/// implies zero failed files; `Partial` implies at least one failed file
/// and `files_processed + files_failed == total_files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Partial,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Partial | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Partial => "partial",
            BatchStatus::Failed => "failed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted unit of work: one or more files, each with a declared
/// document type, processed under bounded concurrency by the scheduler.
///
/// `files_processed + files_failed + files_skipped <= total_files` holds at
/// every point in the batch's life; the counters are mutated only by
/// atomic addition from the worker that owns the file in question (see
/// `scheduler`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub owner: String,
    pub declared_types: Vec<DocumentType>,
    pub total_files: u32,
    pub total_pages: Option<u32>,
    pub files_processed: u32,
    pub files_failed: u32,
    pub files_skipped: u32,
    pub pages_processed: u32,
    pub status: BatchStatus,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Batch {
    pub fn new(id: String, owner: String, declared_types: Vec<DocumentType>, total_files: u32) -> Self {
        Self {
            id,
            owner,
            declared_types,
            total_files,
            total_pages: None,
            files_processed: 0,
            files_failed: 0,
            files_skipped: 0,
            pages_processed: 0,
            status: BatchStatus::Pending,
            cancel_requested: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True once every admitted file has settled (done, failed, or skipped).
    pub fn is_settled(&self) -> bool {
        self.files_processed + self.files_failed + self.files_skipped >= self.total_files
    }

    /// Invariant check used by tests and by the scheduler after every
    /// counter mutation: processed-plus-failed-plus-skipped never exceeds
    /// the total, and a completed batch never carries a failed or skipped
    /// count.
    pub fn check_invariant(&self) -> bool {
        self.files_processed + self.files_failed + self.files_skipped <= self.total_files
            && (self.status != BatchStatus::Completed || (self.files_failed == 0 && self.files_skipped == 0))
            && (self.status != BatchStatus::Partial
                || (self.files_failed > 0
                    && self.files_processed + self.files_failed + self.files_skipped == self.total_files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_batch_with_one_skipped_file_is_not_settled_until_skipped_is_counted() {
        let mut batch = Batch::new("b1".into(), "owner".into(), vec![DocumentType::FakturPajak], 3);
        batch.files_processed = 2;
        batch.files_skipped = 0;
        assert!(!batch.is_settled());

        batch.files_skipped = 1;
        assert!(batch.is_settled());
    }

    #[test]
    fn check_invariant_rejects_a_completed_batch_with_skipped_files() {
        let mut batch = Batch::new("b1".into(), "owner".into(), vec![DocumentType::FakturPajak], 2);
        batch.files_processed = 1;
        batch.files_skipped = 1;
        batch.status = BatchStatus::Completed;
        assert!(!batch.check_invariant());
    }
}
