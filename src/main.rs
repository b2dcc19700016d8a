//! fakturflow CLI/demo-server entry point: `dotenvy` load,
//! `tracing-subscriber` init keyed off verbosity, then dispatch into the
//! CLI.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fakturflow::audit::AuditLog;
use fakturflow::bank::BankAdapterRegistry;
use fakturflow::cli::Cli;
use fakturflow::config::{Config, LlmProviderConfig};
use fakturflow::external::{FilesystemStore, InMemoryStore, StaticTokenValidator};
use fakturflow::hybrid::HybridBankProcessor;
use fakturflow::llm::{ProviderA, ProviderB, SmartMapper};
use fakturflow::notify::NotificationFabric;
use fakturflow::ocr::{OcrRouter, TesseractBackend};
use fakturflow::pipeline::DocumentPipeline;
use fakturflow::scheduler::BatchScheduler;
use fakturflow::server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let default_filter = "fakturflow=info";
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::load().await);
    let state = build_app_state(config).await?;

    fakturflow::cli::run(Cli::parse(), state).await
}

/// Wire up the demo collaborators: in-memory persistence, a filesystem
/// object store rooted at `./data`, the local OCR backend plus whichever
/// cloud backend/LLM providers the loaded config names (falling back to
/// an unreachable placeholder endpoint when unconfigured, since the demo
/// has to construct a provider either way).
async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let persistence = InMemoryStore::new();
    let object_store = Arc::new(FilesystemStore::new("./data"));

    let mut ocr_router = OcrRouter::from_config(&config);
    ocr_router.register("local", Arc::new(TesseractBackend::new()));
    if let Some(cloud_ocr) = &config.cloud_ocr {
        ocr_router.register("cloud", Arc::new(fakturflow::ocr::CloudOcrClient::new(cloud_ocr.clone())));
    }
    let ocr_router = Arc::new(ocr_router);

    let provider_a_config = config.llm_provider_a.clone().unwrap_or_else(placeholder_provider_config);
    let provider_b_config = config.llm_provider_b.clone().unwrap_or_else(placeholder_provider_config);
    let mapper = Arc::new(SmartMapper::new(
        Arc::new(ProviderA::new(provider_a_config)),
        Arc::new(ProviderB::new(provider_b_config)),
    ));

    let bank_registry = Arc::new(BankAdapterRegistry::with_builtin_adapters());
    let hybrid = Arc::new(HybridBankProcessor::new(bank_registry, mapper.clone()));

    let notifier = NotificationFabric::new();
    let upstream_permits = Arc::new(tokio::sync::Semaphore::new(config.global_upstream_permits()));
    let pipeline = Arc::new(DocumentPipeline::new(
        config.clone(),
        object_store.clone(),
        persistence.clone(),
        ocr_router,
        mapper,
        hybrid,
        notifier.clone(),
        upstream_permits,
    ));

    let scheduler = BatchScheduler::new(config.clone(), persistence, object_store, pipeline, notifier.clone());
    scheduler.start();

    let audit_path = config.audit_log_path.clone().unwrap_or_else(|| "./audit.log".into());
    let audit = AuditLog::new(audit_path);

    Ok(AppState {
        scheduler,
        notifier,
        auth: Arc::new(StaticTokenValidator),
        audit,
        session_config: config.session,
    })
}

fn placeholder_provider_config() -> LlmProviderConfig {
    LlmProviderConfig {
        endpoint: "http://localhost:0/unconfigured".to_string(),
        api_key: String::new(),
        model: "unconfigured".to_string(),
    }
}
