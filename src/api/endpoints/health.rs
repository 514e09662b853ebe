//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub rules: usize,
    pub active_encounters: usize,
}

/// `GET /api/health` — liveness plus the size of the rule set in effect.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let rules = ctx.engine.knowledge_base()?.len();
    let active_encounters = ctx.engine.active_encounters()?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        rules,
        active_encounters,
    }))
}
