//! Crate-wide error taxonomy.
//!
//! Every error that can surface out of the pipeline carries an [`ErrorKind`]
//! tag so retry and merge-policy code can branch on the failure class
//! without downcasting concrete error types. Component modules define their
//! own `thiserror` enums (see `ocr::OcrError`, `llm::MapperError`,
//! `bank::BankAdapterError`, `export::ExportError`) and convert into
//! [`CoreError`] at the boundary where the taxonomy actually matters (the
//! Document Pipeline and Batch Scheduler).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error taxonomy from the design spec's error-handling section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request, unsupported type, oversize file, disallowed archive
    /// member. Surfaced to the caller as-is; never retried.
    Validation,
    /// Network timeout, provider 5xx/429. Retried with backoff + jitter.
    UpstreamTransient,
    /// Provider 4xx (bad input, auth). Fails the file; no retry.
    UpstreamPermanent,
    /// LLM returned non-JSON or schema-invalid JSON after one retry.
    ExtractorParse,
    /// Chunker/router refused oversized input; caller must chunk.
    Resource,
    /// Bug-class error; logged with full context.
    Internal,
    /// File terminated at a safe boundary due to a batch cancel.
    Cancelled,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying with backoff.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::UpstreamTransient => "upstream_transient",
            ErrorKind::UpstreamPermanent => "upstream_permanent",
            ErrorKind::ExtractorParse => "extractor_parse",
            ErrorKind::Resource => "resource",
            ErrorKind::Internal => "internal",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The crate's unified error type. Carries a taxonomy tag, a user-safe
/// (non-leaking) message, and an optional chained source for diagnostics.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn upstream_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTransient, message)
    }

    pub fn upstream_permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamPermanent, message)
    }

    pub fn extractor_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExtractorParse, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled at a safe boundary")
    }

    /// Generic, non-leaking message safe to hand back to an external caller.
    /// Diagnostics (the `source` chain) stay in logs via `tracing`.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::UpstreamTransient => "upstream service temporarily unavailable".to_string(),
            ErrorKind::UpstreamPermanent => "upstream service rejected the request".to_string(),
            ErrorKind::ExtractorParse => "extraction produced no usable structured result".to_string(),
            ErrorKind::Resource => self.message.clone(),
            ErrorKind::Internal => "internal error".to_string(),
            ErrorKind::Cancelled => "cancelled".to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            ErrorKind::UpstreamTransient
        } else if let Some(status) = err.status() {
            if status.is_server_error() || status.as_u16() == 429 {
                ErrorKind::UpstreamTransient
            } else {
                ErrorKind::UpstreamPermanent
            }
        } else {
            ErrorKind::UpstreamTransient
        };
        CoreError::with_source(kind, "http request failed", err)
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::with_source(ErrorKind::Internal, "io error", err)
    }
}
