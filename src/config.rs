//! Configuration surface: `prefer` for standard-location file discovery,
//! `serde` for the actual (de)serialization across TOML/YAML/JSON, and
//! environment-variable overrides via `dotenvy` at process start.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::DocumentType;

/// OCR engine selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OcrMode {
    #[default]
    CloudPrimary,
    CloudOnly,
    LocalPrimary,
    LocalOnly,
}

impl OcrMode {
    /// The deterministic engine-selection order for this mode.
    pub fn engine_order(self) -> Vec<&'static str> {
        match self {
            OcrMode::CloudPrimary => vec!["cloud", "local"],
            OcrMode::CloudOnly => vec!["cloud"],
            OcrMode::LocalPrimary => vec!["local", "cloud"],
            OcrMode::LocalOnly => vec!["local"],
        }
    }
}

/// A backend entry: either a single engine that always runs, or an
/// ordered fallback chain tried until one succeeds.
///
/// Examples: `"local"` is a single backend; `["cloud", "local"]` is a
/// fallback chain that tries `cloud` first and falls through to `local`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendEntry {
    Single(String),
    Chain(Vec<String>),
}

impl BackendEntry {
    pub fn backends(&self) -> Vec<&str> {
        match self {
            BackendEntry::Single(s) => vec![s.as_str()],
            BackendEntry::Chain(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// Flatten an ordered list of [`BackendEntry`] into the single fallback
/// order the OCR Router walks. An empty chain configuration means "use
/// the `ocr_mode` preset instead" — see [`Config::ocr_engine_order`].
pub fn flatten_backend_chain(chain: &[BackendEntry]) -> Vec<String> {
    chain.iter().flat_map(|entry| entry.backends().into_iter().map(str::to_string)).collect()
}

/// LLM provider connection settings. Two of these are configured: one per
/// provider in the static routing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// Cloud OCR (Document AI-compatible) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudOcrConfig {
    pub endpoint: String,
    pub project: String,
    pub processor_id: String,
    pub credentials_path: String,
}

/// Notification fabric session timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout_s: u64,
    pub ping_interval_s: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_s: 90,
            ping_interval_s: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_inner_concurrency")]
    pub inner_concurrency: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
    #[serde(default)]
    pub ocr_mode: OcrMode,
    /// Per-entry OCR backend fallback chain, overriding `ocr_mode`'s preset
    /// order when non-empty (e.g. `["cloud", "local"]` or a mix of single
    /// entries and chains).
    #[serde(default)]
    pub ocr_backend_chain: Vec<BackendEntry>,
    #[serde(default = "default_max_files_per_batch")]
    pub max_files_per_batch: u32,
    #[serde(default = "default_max_archive_files")]
    pub max_archive_files: u32,
    #[serde(default = "default_archive_allowed_types")]
    pub archive_allowed_types: HashSet<DocumentType>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    pub llm_provider_a: Option<LlmProviderConfig>,
    pub llm_provider_b: Option<LlmProviderConfig>,
    pub cloud_ocr: Option<CloudOcrConfig>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log_path: Option<PathBuf>,
}

fn default_worker_pool_size() -> usize {
    10
}
fn default_inner_concurrency() -> usize {
    4
}
fn default_chunk_size() -> u32 {
    8
}
fn default_chunk_overlap() -> u32 {
    1
}
fn default_max_files_per_batch() -> u32 {
    50
}
fn default_max_archive_files() -> u32 {
    100
}
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_archive_allowed_types() -> HashSet<DocumentType> {
    // Tax document types only.
    [
        DocumentType::FakturPajak,
        DocumentType::Pph21,
        DocumentType::Pph23,
        DocumentType::Invoice,
    ]
    .into_iter()
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            inner_concurrency: default_inner_concurrency(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            ocr_mode: OcrMode::default(),
            ocr_backend_chain: Vec::new(),
            max_files_per_batch: default_max_files_per_batch(),
            max_archive_files: default_max_archive_files(),
            archive_allowed_types: default_archive_allowed_types(),
            max_file_bytes: default_max_file_bytes(),
            llm_provider_a: None,
            llm_provider_b: None,
            cloud_ocr: None,
            session: SessionConfig::default(),
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Weighted semaphore size protecting upstream OCR/LLM calls: a
    /// single cap sized to `pool * inner` effective permits, preventing a
    /// thundering herd against either provider.
    pub fn global_upstream_permits(&self) -> usize {
        self.worker_pool_size * self.inner_concurrency
    }

    /// The OCR Router's effective fallback order: the configured backend
    /// chain when one is set, else the `ocr_mode` preset.
    pub fn ocr_engine_order(&self) -> Vec<String> {
        if self.ocr_backend_chain.is_empty() {
            self.ocr_mode.engine_order().into_iter().map(str::to_string).collect()
        } else {
            flatten_backend_chain(&self.ocr_backend_chain)
        }
    }

    /// Discover and load configuration via `prefer`-style standard-location
    /// discovery, falling back to defaults plus environment overrides when
    /// no file is found.
    pub async fn load() -> Self {
        match prefer::load("fakturflow").await {
            Ok(pref) => match pref.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_default(),
                None => Self::default_with_env(),
            },
            Err(_) => Self::default_with_env(),
        }
    }

    pub fn default_with_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var("FAKTURFLOW_WORKER_POOL_SIZE") {
            if let Ok(n) = val.parse() {
                config.worker_pool_size = n;
            }
        }
        if let Ok(val) = std::env::var("FAKTURFLOW_OCR_MODE") {
            config.ocr_mode = match val.as_str() {
                "cloud_only" => OcrMode::CloudOnly,
                "local_primary" => OcrMode::LocalPrimary,
                "local_only" => OcrMode::LocalOnly,
                _ => OcrMode::CloudPrimary,
            };
        }
        config
    }

    /// Load configuration from a specific file path, dispatching on
    /// extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read config file: {e}"))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        match ext {
            "toml" => toml::from_str(&contents).map_err(|e| format!("invalid toml config: {e}")),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| format!("invalid yaml config: {e}")),
            _ => serde_json::from_str(&contents).map_err(|e| format!("invalid json config: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.worker_pool_size, 10);
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.max_files_per_batch, 50);
        assert_eq!(config.max_archive_files, 100);
        assert!(!config.archive_allowed_types.contains(&DocumentType::RekeningKoran));
        assert_eq!(config.global_upstream_permits(), 40);
    }

    #[test]
    fn empty_backend_chain_falls_back_to_ocr_mode_preset() {
        let config = Config::default();
        assert_eq!(config.ocr_engine_order(), vec!["cloud", "local"]);
    }

    #[test]
    fn backend_chain_overrides_ocr_mode_preset_when_set() {
        let mut config = Config::default();
        config.ocr_backend_chain = vec![
            BackendEntry::Single("local".into()),
            BackendEntry::Chain(vec!["cloud".into(), "local".into()]),
        ];
        assert_eq!(config.ocr_engine_order(), vec!["local", "cloud", "local"]);
    }

    #[test]
    fn backend_entry_deserializes_from_either_a_string_or_an_array() {
        let single: BackendEntry = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(single, BackendEntry::Single("local".into()));

        let chain: BackendEntry = serde_json::from_str(r#"["cloud", "local"]"#).unwrap();
        assert_eq!(chain, BackendEntry::Chain(vec!["cloud".into(), "local".into()]));
    }
}
