//! OCR Router: a uniform interface over the cloud engine and its
//! configured local fallbacks, trying engines in the order
//! [`crate::config::OcrMode::engine_order`] dictates and recording which
//! engine produced the final result.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::backend::{OcrBackend, OcrError, OcrOutcome};
use crate::config::{Config, OcrMode};

pub struct OcrRouter {
    backends: HashMap<&'static str, Arc<dyn OcrBackend>>,
    order: Vec<String>,
}

impl OcrRouter {
    pub fn new(mode: OcrMode) -> Self {
        Self {
            backends: HashMap::new(),
            order: mode.engine_order().into_iter().map(str::to_string).collect(),
        }
    }

    /// Build a router whose fallback order follows the configured backend
    /// chain (falling back to the `ocr_mode` preset when unset).
    pub fn from_config(config: &Config) -> Self {
        Self {
            backends: HashMap::new(),
            order: config.ocr_engine_order(),
        }
    }

    pub fn register(&mut self, key: &'static str, backend: Arc<dyn OcrBackend>) {
        self.backends.insert(key, backend);
    }

    /// Try each eligible engine in deterministic order; on failure, fall
    /// through to the next. Returns the first success, tagged with which
    /// engine produced it.
    pub async fn process(&self, path: &Path) -> Result<OcrOutcome, OcrError> {
        let mut last_err = None;
        for key in &self.order {
            let Some(backend) = self.backends.get(key.as_str()) else {
                continue;
            };
            if !backend.is_available().await {
                warn!(engine = key, "ocr engine unavailable, trying next");
                continue;
            }
            match backend.run(path).await {
                Ok(outcome) => {
                    info!(engine = key, confidence = outcome.confidence, "ocr succeeded");
                    return Ok(outcome);
                }
                Err(err) => {
                    warn!(engine = key, error = %err, "ocr engine failed, trying next");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| OcrError::BackendNotAvailable("no eligible ocr engine registered".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBackend {
        id: &'static str,
        fail_times: AtomicUsize,
    }

    #[async_trait]
    impl OcrBackend for FlakyBackend {
        fn engine_id(&self) -> &'static str {
            self.id
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn run(&self, _path: &Path) -> Result<OcrOutcome, OcrError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(OcrError::Transient("simulated".into()));
            }
            Ok(OcrOutcome {
                text: "ok".into(),
                pages: vec![],
                confidence: 0.9,
                engine_id: self.id.to_string(),
                processing_time_ms: 1,
            })
        }
    }

    #[tokio::test]
    async fn falls_back_to_next_engine_on_failure() {
        let mut router = OcrRouter::new(OcrMode::CloudPrimary);
        router.register(
            "cloud",
            Arc::new(FlakyBackend {
                id: "cloud",
                fail_times: AtomicUsize::new(99),
            }),
        );
        router.register(
            "local",
            Arc::new(FlakyBackend {
                id: "local",
                fail_times: AtomicUsize::new(0),
            }),
        );

        let outcome = router.process(Path::new("/tmp/doesnotmatter.pdf")).await.unwrap();
        assert_eq!(outcome.engine_id, "local");
    }

    #[tokio::test]
    async fn cloud_only_never_tries_local() {
        let mut router = OcrRouter::new(OcrMode::CloudOnly);
        router.register(
            "cloud",
            Arc::new(FlakyBackend {
                id: "cloud",
                fail_times: AtomicUsize::new(0),
            }),
        );
        router.register(
            "local",
            Arc::new(FlakyBackend {
                id: "local",
                fail_times: AtomicUsize::new(0),
            }),
        );

        let outcome = router.process(Path::new("/tmp/x.pdf")).await.unwrap();
        assert_eq!(outcome.engine_id, "cloud");
    }

    #[tokio::test]
    async fn from_config_follows_the_configured_backend_chain_over_the_mode_preset() {
        use crate::config::{BackendEntry, Config};

        let mut config = Config::default();
        config.ocr_mode = OcrMode::CloudOnly;
        config.ocr_backend_chain = vec![BackendEntry::Chain(vec!["local".into(), "cloud".into()])];

        let mut router = OcrRouter::from_config(&config);
        router.register(
            "local",
            Arc::new(FlakyBackend {
                id: "local",
                fail_times: AtomicUsize::new(99),
            }),
        );
        router.register(
            "cloud",
            Arc::new(FlakyBackend {
                id: "cloud",
                fail_times: AtomicUsize::new(0),
            }),
        );

        let outcome = router.process(Path::new("/tmp/x.pdf")).await.unwrap();
        assert_eq!(outcome.engine_id, "cloud");
    }
}
