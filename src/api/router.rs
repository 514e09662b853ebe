//! Safety API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Layers (outermost → innermost): CORS → access log → handler.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::safety::DefaultSafetyEngine;

/// Build the safety API router around a shared engine.
pub fn safety_api_router(engine: Arc<DefaultSafetyEngine>) -> Router {
    build_router(ApiContext::new(engine))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/interactions", get(endpoints::interactions::lookup))
        .route(
            "/patients/:patient_id/allergies",
            put(endpoints::allergies::replace),
        )
        .route(
            "/encounters/:patient_id/:encounter_id",
            delete(endpoints::encounters::end),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/evaluate",
            post(endpoints::encounters::evaluate),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/override",
            post(endpoints::encounters::override_check),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/clear",
            post(endpoints::encounters::clear),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/gate",
            get(endpoints::encounters::gate),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/current",
            get(endpoints::encounters::current),
        )
        .route(
            "/encounters/:patient_id/:encounter_id/history",
            get(endpoints::encounters::history),
        )
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new().nest("/api", api)
}
