//! Hybrid Bank Processor: runs the Bank Adapter Registry
//! and the Smart Mapper concurrently over one rekening koran OCR outcome,
//! then merges their output with a fixed confidence policy. Adapters are
//! cheap and precise on a known layout; the mapper is flexible but costly
//! and non-deterministic — merging gets the best of both.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bank::BankAdapterRegistry;
use crate::error::CoreResult;
use crate::llm::{builtin_template, SmartMapper};
use crate::models::{dedupe_and_order, RekeningKoranPayload, StructuredPayload};
use crate::ocr::OcrOutcome;

pub struct HybridResult {
    pub payload: RekeningKoranPayload,
    pub confidence: f32,
}

pub struct HybridBankProcessor {
    registry: Arc<BankAdapterRegistry>,
    mapper: Arc<SmartMapper>,
}

impl HybridBankProcessor {
    pub fn new(registry: Arc<BankAdapterRegistry>, mapper: Arc<SmartMapper>) -> Self {
        Self { registry, mapper }
    }

    pub async fn process(&self, ocr: &OcrOutcome) -> CoreResult<HybridResult> {
        let template = builtin_template(crate::models::DocumentType::RekeningKoran);

        let adapter_fut = async { self.registry.detect_and_parse(ocr) };
        let mapper_fut = self.mapper.map(&template, &ocr.text);
        let (adapter_outcome, mapper_outcome) = tokio::join!(adapter_fut, mapper_fut);

        let adapter_data = match adapter_outcome {
            Some(Ok((txns, identity, bank_code))) => {
                info!(bank = bank_code, rows = txns.len(), "bank adapter matched");
                Some((txns, identity))
            }
            Some(Err(err)) => {
                warn!(error = %err, "bank adapter matched but failed to parse rows");
                None
            }
            None => None,
        };

        let mapper_payload = match mapper_outcome {
            Ok(StructuredPayload::RekeningKoran(payload)) => Some(payload),
            Ok(other) => {
                warn!(document_type = %other.document_type(), "smart mapper returned unexpected variant for rekening koran");
                None
            }
            Err(err) => {
                warn!(error = %err, "smart mapper failed on rekening koran path");
                None
            }
        };

        if adapter_data.is_none() && mapper_payload.is_none() {
            // Neither extractor produced anything usable. This is not a
            // pipeline failure — persist an empty record at zero
            // confidence so the user can still inspect raw OCR text.
            warn!("neither bank adapter nor smart mapper produced a usable rekening koran result");
            return Ok(HybridResult {
                payload: RekeningKoranPayload::default(),
                confidence: 0.0,
            });
        }

        let adapter_success = matches!(&adapter_data, Some((txns, _)) if !txns.is_empty());
        let mapper_success = mapper_payload.is_some();

        let mut payload = mapper_payload.unwrap_or_default();

        // Transactions: prefer adapter output when it produced at least one
        // record, otherwise fall back to the mapper's.
        if let Some((txns, _)) = &adapter_data {
            if !txns.is_empty() {
                payload.transactions = txns.clone();
            }
        }
        payload.transactions = dedupe_and_order(std::mem::take(&mut payload.transactions));

        // Metadata: prefer mapper output, fill gaps from the adapter's
        // identity extraction.
        let mut metadata_fields_filled = 0u32;
        if let Some((_, identity)) = &adapter_data {
            if payload.nama_bank.is_empty() && !identity.bank_name.is_empty() {
                payload.nama_bank = identity.bank_name.clone();
                metadata_fields_filled += 1;
            }
            if payload.nomor_rekening.is_empty() && !identity.nomor_rekening.is_empty() {
                payload.nomor_rekening = identity.nomor_rekening.clone();
                metadata_fields_filled += 1;
            }
            if payload.nama_pemegang.is_empty() && !identity.nama_pemegang.is_empty() {
                payload.nama_pemegang = identity.nama_pemegang.clone();
                metadata_fields_filled += 1;
            }
        }
        let adapter_metadata_fill = metadata_fields_filled as f32 / 3.0;

        let confidence = 0.50 * if adapter_success { 1.0 } else { 0.0 }
            + 0.30 * if mapper_success { 1.0 } else { 0.0 }
            + 0.20 * adapter_metadata_fill;
        let confidence = confidence.clamp(0.0, 1.0);

        Ok(HybridResult { payload, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::ocr::OcrPage;

    struct AlwaysErrorsProvider;

    #[async_trait]
    impl crate::llm::LlmProvider for AlwaysErrorsProvider {
        fn provider_id(&self) -> &'static str {
            "always-errors"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn complete(&self, _prompt: &str) -> Result<String, crate::llm::MapperError> {
            Err(crate::llm::MapperError::Unavailable("no upstream in this test".into()))
        }
    }

    fn unknown_bank_ocr_outcome() -> OcrOutcome {
        OcrOutcome {
            text: "totally unrecognized statement layout".into(),
            pages: vec![OcrPage {
                page_number: 1,
                text: "totally unrecognized statement layout".into(),
                tables: vec![],
                blocks: vec![],
            }],
            confidence: 0.8,
            engine_id: "local".into(),
            processing_time_ms: 5,
        }
    }

    /// Edge case: when neither the bank adapter registry nor the smart
    /// mapper can produce anything usable, the processor returns `Ok` at
    /// zero confidence rather than propagating an error.
    #[tokio::test]
    async fn both_paths_failing_yields_empty_payload_at_zero_confidence() {
        let registry = Arc::new(BankAdapterRegistry::new());
        let mapper = Arc::new(SmartMapper::new(Arc::new(AlwaysErrorsProvider), Arc::new(AlwaysErrorsProvider)));
        let processor = HybridBankProcessor::new(registry, mapper);

        let result = processor.process(&unknown_bank_ocr_outcome()).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(result.payload.transactions.is_empty());
    }

    /// An unknown bank with no adapter match but a usable mapper result
    /// still settles the file, just at a low confidence band, never as a
    /// hard failure.
    #[tokio::test]
    async fn unknown_bank_falls_through_to_mapper_alone() {
        let registry = Arc::new(BankAdapterRegistry::new());
        let mapper_only_provider = Arc::new(ScriptedMapperProvider {
            response: r#"{"nama_bank":"Unknown Bank","nomor_rekening":"000","nama_pemegang":"x","periode":"01-2026","saldo_awal":"0","saldo_akhir":"0","transactions":[]}"#,
        });
        let mapper = Arc::new(SmartMapper::new(Arc::new(AlwaysErrorsProvider), mapper_only_provider));
        let processor = HybridBankProcessor::new(registry, mapper);

        let result = processor.process(&unknown_bank_ocr_outcome()).await.unwrap();
        assert!(result.confidence <= 0.30);
        assert_eq!(result.payload.nama_bank, "Unknown Bank");
    }

    struct ScriptedMapperProvider {
        response: &'static str,
    }

    #[async_trait]
    impl crate::llm::LlmProvider for ScriptedMapperProvider {
        fn provider_id(&self) -> &'static str {
            "scripted"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn complete(&self, _prompt: &str) -> Result<String, crate::llm::MapperError> {
            Ok(self.response.to_string())
        }
    }
}
