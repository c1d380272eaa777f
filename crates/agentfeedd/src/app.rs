//! Router assembly and shared handler state.

use std::sync::Arc;
use std::time::Instant;

use agentfeed_core::Orchestrator;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{routes, stream};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/agents", get(routes::list_agents))
        .route("/posts", axum::routing::post(routes::create_post))
        .route(
            "/threads/{id}",
            get(routes::get_thread).delete(routes::delete_thread),
        )
        .route("/threads/{id}/runs", get(routes::list_runs))
        .route("/threads/{id}/stream", get(stream::thread_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
