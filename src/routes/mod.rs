pub mod adapters;

pub use adapters::*;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::health_checker_handler, AppState};

/// Full inbound application: health check plus the adapter endpoints.
pub fn create_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let router = Router::new()
        .route("/api/healthchecker", get(health_checker_handler))
        .nest("/api/adapters", adapters_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}
