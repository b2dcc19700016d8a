//! Router assembly: a flat route table plus a permissive CORS layer for
//! the demo.

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::{handlers, ws, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/batches", post(handlers::submit_batch))
        .route("/batches", get(handlers::list_batches))
        .route("/batches/:batch_id", get(handlers::get_batch))
        .route("/batches/:batch_id/cancel", post(handlers::cancel_batch))
        .route("/batches/:batch_id/results", get(handlers::get_results))
        .route("/batches/:batch_id/export", get(handlers::export_batch_handler))
        .route(
            "/batches/:batch_id/results/:document_file_id/export",
            get(handlers::export_single_handler),
        )
        .route("/results/:result_id", patch(handlers::update_result))
        .route("/ws/notifications/:topic_kind/:topic_id", get(ws::upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
