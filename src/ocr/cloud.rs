//! Cloud OCR backend: a thin `reqwest` client over a Google Document
//! AI-compatible HTTP endpoint — a configured `reqwest::Client` with a
//! fixed timeout, one POST per document, `serde_json` (de)coding.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CloudOcrConfig;

use super::backend::{OcrBackend, OcrBlock, OcrError, OcrOutcome, OcrPage, OcrTable};

pub struct CloudOcrClient {
    config: CloudOcrConfig,
    client: Client,
}

impl CloudOcrClient {
    pub fn new(config: CloudOcrConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 min default OCR deadline
            .build()
            .expect("failed to build http client");
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    project: &'a str,
    processor_id: &'a str,
    #[serde(with = "base64_bytes")]
    content: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    text: String,
    pages: Vec<CloudPage>,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct CloudPage {
    page_number: u32,
    text: String,
    #[serde(default)]
    tables: Vec<Vec<Vec<String>>>,
    #[serde(default)]
    blocks: Vec<CloudBlock>,
}

#[derive(Debug, Deserialize)]
struct CloudBlock {
    text: String,
    confidence: Option<f32>,
}

mod base64_bytes {
    use base64::Engine;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &&[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[async_trait]
impl OcrBackend for CloudOcrClient {
    fn engine_id(&self) -> &'static str {
        "cloud_document_ai"
    }

    async fn is_available(&self) -> bool {
        !self.config.endpoint.is_empty()
    }

    async fn run(&self, path: &Path) -> Result<OcrOutcome, OcrError> {
        let started = Instant::now();
        let content = tokio::fs::read(path).await?;

        let request = ProcessRequest {
            project: &self.config.project,
            processor_id: &self.config.processor_id,
            content: &content,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    OcrError::Transient(e.to_string())
                } else {
                    OcrError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(OcrError::Transient(format!("cloud ocr http {status}")));
        }
        if !status.is_success() {
            return Err(OcrError::Permanent(format!("cloud ocr http {status}")));
        }

        let parsed: ProcessResponse = response
            .json()
            .await
            .map_err(|e| OcrError::OcrFailed(format!("invalid cloud ocr response: {e}")))?;

        let pages = parsed
            .pages
            .into_iter()
            .map(|p| OcrPage {
                page_number: p.page_number,
                text: p.text,
                tables: p.tables.into_iter().map(|rows| OcrTable { rows }).collect(),
                blocks: p
                    .blocks
                    .into_iter()
                    .map(|b| OcrBlock {
                        text: b.text,
                        confidence: b.confidence,
                    })
                    .collect(),
            })
            .collect();

        Ok(OcrOutcome {
            text: parsed.text,
            pages,
            confidence: parsed.confidence,
            engine_id: self.engine_id().to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
