//! Smart Mapper: the AI-backed extraction step. Builds a
//! JSON-only prompt from a [`Template`], calls the statically routed
//! provider, and parses the response into the document type's
//! [`StructuredPayload`] variant. A single malformed response earns one
//! repair attempt before the file is flagged `extractor_parse`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{
    DocumentType, FakturPajakPayload, InvoicePayload, Pph21Payload, Pph23Payload,
    RekeningKoranPayload, StructuredPayload, Template,
};

use super::prompts::{extraction_prompt, repair_prompt};
use super::provider::{LlmProvider, MapperError};

pub struct SmartMapper {
    provider_a: Arc<dyn LlmProvider>,
    provider_b: Arc<dyn LlmProvider>,
}

impl SmartMapper {
    pub fn new(provider_a: Arc<dyn LlmProvider>, provider_b: Arc<dyn LlmProvider>) -> Self {
        Self { provider_a, provider_b }
    }

    /// Static routing: rekening koran goes to provider B, every other tax
    /// document type goes to provider A.
    fn provider_for(&self, document_type: DocumentType) -> &Arc<dyn LlmProvider> {
        match document_type {
            DocumentType::RekeningKoran => &self.provider_b,
            _ => &self.provider_a,
        }
    }

    pub async fn map(&self, template: &Template, ocr_text: &str) -> Result<StructuredPayload, MapperError> {
        let provider = self.provider_for(template.document_type);
        let prompt = extraction_prompt(template, ocr_text);

        let response = provider.complete(&prompt).await?;
        match parse_payload(template.document_type, &response) {
            Ok(payload) => Ok(payload),
            Err(first_err) => {
                warn!(
                    provider = provider.provider_id(),
                    schema = %template.schema_name,
                    error = %first_err,
                    "smart mapper response failed to parse, retrying once"
                );
                let repair = repair_prompt(template, &response);
                let retried = provider.complete(&repair).await?;
                parse_payload(template.document_type, &retried).map_err(|e| {
                    debug!(schema = %template.schema_name, "smart mapper repair attempt also failed");
                    e
                })
            }
        }
    }
}

/// Strip markdown code fences a model may wrap its JSON in despite being
/// told not to, then deserialize into the document type's payload struct.
fn parse_payload(document_type: DocumentType, raw: &str) -> Result<StructuredPayload, MapperError> {
    let cleaned = strip_fences(raw);
    match document_type {
        DocumentType::FakturPajak => serde_json::from_str::<FakturPajakPayload>(cleaned)
            .map(StructuredPayload::FakturPajak)
            .map_err(|e| MapperError::Parse(e.to_string())),
        DocumentType::Pph21 => serde_json::from_str::<Pph21Payload>(cleaned)
            .map(StructuredPayload::Pph21)
            .map_err(|e| MapperError::Parse(e.to_string())),
        DocumentType::Pph23 => serde_json::from_str::<Pph23Payload>(cleaned)
            .map(StructuredPayload::Pph23)
            .map_err(|e| MapperError::Parse(e.to_string())),
        DocumentType::Invoice => serde_json::from_str::<InvoicePayload>(cleaned)
            .map(StructuredPayload::Invoice)
            .map_err(|e| MapperError::Parse(e.to_string())),
        DocumentType::RekeningKoran => serde_json::from_str::<RekeningKoranPayload>(cleaned)
            .map(StructuredPayload::RekeningKoran)
            .map_err(|e| MapperError::Parse(e.to_string())),
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_start();
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        id: &'static str,
        responses: Vec<&'static str>,
        call: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn provider_id(&self) -> &'static str {
            self.id
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(&self, _prompt: &str) -> Result<String, MapperError> {
            let idx = self.call.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses[idx.min(self.responses.len() - 1)].to_string())
        }
    }

    fn template_for(doc_type: DocumentType) -> Template {
        super::super::template::builtin_template(doc_type)
    }

    #[tokio::test]
    async fn parses_clean_json_on_first_try() {
        let provider_a: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "a",
            responses: vec![r#"{"vendor":{},"customer":{},"line_items":[],"subtotal":"10","tax":"1","total":"11"}"#],
            call: AtomicUsize::new(0),
        });
        let provider_b: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "b",
            responses: vec!["{}"],
            call: AtomicUsize::new(0),
        });
        let mapper = SmartMapper::new(provider_a, provider_b);
        let result = mapper.map(&template_for(DocumentType::Invoice), "ocr text").await.unwrap();
        assert!(matches!(result, StructuredPayload::Invoice(_)));
    }

    #[tokio::test]
    async fn recovers_on_repair_attempt() {
        let provider_a: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "a",
            responses: vec![
                "not json at all",
                r#"{"vendor":{},"customer":{},"line_items":[],"subtotal":"10","tax":"1","total":"11"}"#,
            ],
            call: AtomicUsize::new(0),
        });
        let provider_b: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "b",
            responses: vec!["{}"],
            call: AtomicUsize::new(0),
        });
        let mapper = SmartMapper::new(provider_a, provider_b);
        let result = mapper.map(&template_for(DocumentType::Invoice), "ocr text").await.unwrap();
        assert!(matches!(result, StructuredPayload::Invoice(_)));
    }

    #[tokio::test]
    async fn flags_extractor_parse_after_repair_also_fails() {
        let provider_a: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "a",
            responses: vec!["garbage", "still garbage"],
            call: AtomicUsize::new(0),
        });
        let provider_b: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "b",
            responses: vec!["{}"],
            call: AtomicUsize::new(0),
        });
        let mapper = SmartMapper::new(provider_a, provider_b);
        let err = mapper.map(&template_for(DocumentType::Invoice), "ocr text").await.unwrap_err();
        assert!(matches!(err, MapperError::Parse(_)));
    }

    #[tokio::test]
    async fn rekening_koran_routes_to_provider_b() {
        let provider_a: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "a",
            responses: vec!["{}"],
            call: AtomicUsize::new(0),
        });
        let provider_b: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            id: "b",
            responses: vec![
                r#"{"nama_bank":"Bank","nomor_rekening":"123","nama_pemegang":"x","periode":"01-2026","saldo_awal":"0","saldo_akhir":"0","transactions":[]}"#,
            ],
            call: AtomicUsize::new(0),
        });
        let mapper = SmartMapper::new(provider_a, provider_b);
        let result = mapper
            .map(&template_for(DocumentType::RekeningKoran), "ocr text")
            .await
            .unwrap();
        assert!(matches!(result, StructuredPayload::RekeningKoran(_)));
    }
}
