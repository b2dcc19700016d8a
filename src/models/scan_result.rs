use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::StructuredPayload;
use crate::error::{CoreError, CoreResult};

/// Per-stage timing breakdown, reported to callers and logged at `debug`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub ocr_ms: u64,
    pub extraction_ms: u64,
    pub total_ms: u64,
}

/// The result of successfully (or best-effort) processing one
/// [`super::DocumentFile`]. Exactly one `ScanResult` exists per file that
/// reaches `done`; `payload` is user-editable post-hoc via `update_result`,
/// which is audit-logged but does not create a new result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: String,
    pub document_file_id: String,
    pub raw_text: String,
    pub payload: StructuredPayload,
    pub confidence: f32,
    pub ocr_engine_id: String,
    pub ai_model_id: Option<String>,
    pub timings: StageTimings,
    pub created_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(
        id: String,
        document_file_id: String,
        raw_text: String,
        payload: StructuredPayload,
        confidence: f32,
        ocr_engine_id: String,
        ai_model_id: Option<String>,
        timings: StageTimings,
    ) -> Self {
        Self {
            id,
            document_file_id,
            raw_text,
            payload,
            confidence: confidence.clamp(0.0, 1.0),
            ocr_engine_id,
            ai_model_id,
            timings,
            created_at: Utc::now(),
        }
    }

    /// Apply a partial structured-payload correction: merges the given
    /// top-level fields into the serialized payload and re-validates it by
    /// deserializing back into [`StructuredPayload`]. `document_type` is
    /// preserved regardless of what the patch contains, since it selects
    /// which payload variant this result holds.
    pub fn apply_patch(&mut self, patch: serde_json::Value) -> CoreResult<()> {
        let mut value = serde_json::to_value(&self.payload)
            .map_err(|e| CoreError::internal(format!("failed to serialize existing payload: {e}")))?;
        let Some(patch_obj) = patch.as_object() else {
            return Err(CoreError::validation("patch must be a json object"));
        };
        let Some(target) = value.as_object_mut() else {
            return Err(CoreError::internal("existing payload did not serialize to a json object"));
        };
        for (key, val) in patch_obj {
            if key == "document_type" {
                continue;
            }
            target.insert(key.clone(), val.clone());
        }
        self.payload = serde_json::from_value(value)
            .map_err(|e| CoreError::validation(format!("patch produced an invalid payload: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FakturPajakPayload, StructuredPayload};

    fn sample_result() -> ScanResult {
        ScanResult::new(
            "result-1".into(),
            "file-1".into(),
            "raw text".into(),
            StructuredPayload::FakturPajak(FakturPajakPayload {
                invoice_number: "INV-001".into(),
                ..Default::default()
            }),
            0.8,
            "cloud".into(),
            None,
            StageTimings::default(),
        )
    }

    #[test]
    fn apply_patch_merges_a_single_field_and_keeps_the_rest() {
        let mut result = sample_result();
        result.apply_patch(serde_json::json!({ "invoice_number": "INV-002" })).unwrap();
        match result.payload {
            StructuredPayload::FakturPajak(payload) => assert_eq!(payload.invoice_number, "INV-002"),
            _ => panic!("patch changed the payload variant"),
        }
    }

    #[test]
    fn apply_patch_ignores_an_attempt_to_change_document_type() {
        let mut result = sample_result();
        result
            .apply_patch(serde_json::json!({ "document_type": "invoice", "invoice_number": "INV-003" }))
            .unwrap();
        assert_eq!(result.payload.document_type(), crate::models::DocumentType::FakturPajak);
    }

    #[test]
    fn apply_patch_rejects_a_non_object_patch() {
        let mut result = sample_result();
        let err = result.apply_patch(serde_json::json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
