use serde::{Deserialize, Serialize};

/// A pub/sub topic. Clients subscribe implicitly by the route they
/// joined: `batch:{id}` or `file:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Batch(String),
    File(String),
}

impl Topic {
    pub fn as_key(&self) -> String {
        match self {
            Topic::Batch(id) => format!("batch:{id}"),
            Topic::File(id) => format!("file:{id}"),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Phase tag attached to a [`ProgressEvent`]; distinct from
/// [`crate::pipeline::FileState`] so the notification fabric's wire shape
/// doesn't have to change whenever the internal state machine grows a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BatchSubmitted,
    FileOcrRunning,
    FileRouted,
    FileExtracting,
    FilePersisting,
    FileDone,
    FileFailed,
    FileSkipped,
    BatchCompleted,
    BatchPartial,
    BatchCancelled,
}

/// A single progress notification. Sequence numbers are strictly
/// increasing and contiguous per topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub topic: String,
    pub phase: Phase,
    pub sequence: u64,
    pub files_processed: u32,
    pub files_failed: u32,
    pub pages_processed: u32,
    pub total_files: u32,
    pub total_pages: Option<u32>,
}
