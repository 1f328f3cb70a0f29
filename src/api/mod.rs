use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::domains::export::ExportService;

pub mod error;
pub mod handlers;

pub use error::ApiError;

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub exports: Arc<dyn ExportService>,
}

impl AppState {
    pub fn new(exports: Arc<dyn ExportService>) -> Self {
        Self { exports }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/finalise/generate_preview",
            post(handlers::generate_preview),
        )
        .route("/finalise/", post(handlers::run_finalise))
        .route("/finalise/schedule/:category", get(handlers::schedule_finalise))
        .route(
            "/finalise/jobs/:id",
            get(handlers::get_job).delete(handlers::remove_job),
        )
        .route("/finalise/download/zip", get(handlers::download_archive))
        .with_state(state)
}
