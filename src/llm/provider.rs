//! LLM provider abstraction: a narrow trait so the Smart Mapper can hold
//! two independently configured providers (static routing: tax documents
//! to provider A, rekening koran to provider B) behind one interface.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{CoreError, ErrorKind};

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("upstream transient failure: {0}")]
    Transient(String),
    #[error("upstream rejected request: {0}")]
    Permanent(String),
    #[error("model returned non-JSON or schema-invalid output after retry: {0}")]
    Parse(String),
}

impl MapperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapperError::Unavailable(_) => ErrorKind::Resource,
            MapperError::Transient(_) => ErrorKind::UpstreamTransient,
            MapperError::Permanent(_) => ErrorKind::UpstreamPermanent,
            MapperError::Parse(_) => ErrorKind::ExtractorParse,
        }
    }
}

impl From<MapperError> for CoreError {
    fn from(err: MapperError) -> Self {
        let kind = err.kind();
        CoreError::with_source(kind, "smart mapper failure", err)
    }
}

/// One LLM backend: given a prompt, return the raw completion text. The
/// caller (the Smart Mapper) owns JSON parsing and the retry-once policy;
/// the provider itself only knows how to reach its endpoint.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &'static str;
    async fn is_available(&self) -> bool;
    async fn complete(&self, prompt: &str) -> Result<String, MapperError>;
}
