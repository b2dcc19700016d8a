//! Local OCR fallback: one Tesseract-style backend, shelling out to a
//! system binary, stands in for "a local engine is configured". A local
//! engine need only guarantee text + approximate confidence, not
//! table/block structure.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{OcrBackend, OcrError, OcrOutcome, OcrPage};

pub struct TesseractBackend {
    binary: String,
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn engine_id(&self) -> &'static str {
        "tesseract_local"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn run(&self, path: &Path) -> Result<OcrOutcome, OcrError> {
        let started = Instant::now();
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .output()
            .await
            .map_err(|e| OcrError::BackendNotAvailable(e.to_string()))?;

        if !output.status.success() {
            return Err(OcrError::OcrFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(OcrOutcome {
            pages: vec![OcrPage {
                page_number: 1,
                text: text.clone(),
                tables: Vec::new(),
                blocks: Vec::new(),
            }],
            text,
            // Local engines only guarantee an approximate confidence.
            confidence: 0.6,
            engine_id: self.engine_id().to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
