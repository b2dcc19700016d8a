//! Registry of known bank adapters. Probed in a deterministic order over
//! OCR text; first match wins. Built once at startup and never mutated
//! afterward, so no synchronization is needed around lookups.

use std::sync::Arc;

use tracing::debug;

use super::adapter::{AccountIdentity, BankAdapter, BankAdapterError};
use crate::models::StandardizedTransaction;
use crate::ocr::OcrOutcome;

pub struct BankAdapterRegistry {
    adapters: Vec<Arc<dyn BankAdapter>>,
}

impl BankAdapterRegistry {
    pub fn new() -> Self {
        Self { adapters: Vec::new() }
    }

    /// Adding an adapter is purely additive — no changes to merge or
    /// dispatch logic.
    pub fn register(&mut self, adapter: Arc<dyn BankAdapter>) {
        self.adapters.push(adapter);
    }

    /// Registry pre-populated with the 11 known layouts.
    pub fn with_builtin_adapters() -> Self {
        let mut registry = Self::new();
        for adapter in super::adapters::builtin_adapters() {
            registry.register(adapter);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// First matching adapter, parsed. `None` means no registered adapter
    /// recognized the statement; the caller falls back to the Smart
    /// Mapper alone.
    pub fn detect_and_parse(
        &self,
        ocr: &OcrOutcome,
    ) -> Option<Result<(Vec<StandardizedTransaction>, AccountIdentity, &'static str), BankAdapterError>> {
        for adapter in &self.adapters {
            if adapter.detect(&ocr.text) {
                debug!(bank = adapter.bank_name(), "bank adapter matched");
                return Some(adapter.parse(ocr).map(|(txns, identity)| (txns, identity, adapter.bank_code())));
            }
        }
        None
    }
}

impl Default for BankAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_eleven_adapters() {
        let registry = BankAdapterRegistry::with_builtin_adapters();
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn unmatched_text_returns_none() {
        let registry = BankAdapterRegistry::with_builtin_adapters();
        let ocr = OcrOutcome {
            text: "this statement belongs to no known bank layout".to_string(),
            pages: vec![],
            confidence: 0.9,
            engine_id: "test".to_string(),
            processing_time_ms: 0,
        };
        assert!(registry.detect_and_parse(&ocr).is_none());
    }
}
