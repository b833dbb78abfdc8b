//! te-server library - TuringEyes survey backend
//!
//! Exposes the router and state for the binary and integration tests.

pub mod api;
pub mod catalog;
pub mod coerce;
pub mod db;
pub mod error;
pub mod participant;
pub mod sampling;
pub mod scoring;
pub mod settings;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::settings::RuntimeSettings;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Survey tunables, fixed for the life of the process
    pub settings: Arc<RuntimeSettings>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: RuntimeSettings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::start_test_routes())
        .merge(api::submit_trials_routes())
        .merge(api::demographics_routes())
        .merge(api::results_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
