//! Demo HTTP/WebSocket transport shell: an `AppState` carrying
//! `Arc`-shared collaborators, `routes::create_router` building the
//! `axum::Router`, handlers thin and mostly delegating into the core
//! library. This is a demonstration harness, not a fixed transport
//! contract.

mod handlers;
mod routes;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;

use crate::audit::AuditLog;
use crate::external::AuthValidator;
use crate::notify::NotificationFabric;
use crate::scheduler::BatchScheduler;

pub use routes::create_router;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<BatchScheduler>,
    pub notifier: Arc<NotificationFabric>,
    pub auth: Arc<dyn AuthValidator>,
    pub audit: Arc<AuditLog>,
    pub session_config: crate::config::SessionConfig,
}

/// Start the demo axum server. Production deployments wire their own
/// `AppState` construction against durable collaborators; this binds the
/// in-memory/filesystem reference implementations for local use.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!(%addr, "starting fakturflow demo server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
