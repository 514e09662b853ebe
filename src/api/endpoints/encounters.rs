//! Encounter check-session endpoints.
//!
//! - `POST   /api/encounters/:patient_id/:encounter_id/evaluate`
//! - `POST   /api/encounters/:patient_id/:encounter_id/override`
//! - `POST   /api/encounters/:patient_id/:encounter_id/clear`
//! - `GET    /api/encounters/:patient_id/:encounter_id/gate`
//! - `GET    /api/encounters/:patient_id/:encounter_id/current`
//! - `GET    /api/encounters/:patient_id/:encounter_id/history`
//! - `DELETE /api/encounters/:patient_id/:encounter_id`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, CheckResponse, CurrentCheckResponse, EndEncounterResponse, EvaluateRequest,
    GateResponse, HistoryResponse, OverrideRequest,
};
use crate::safety::{messages, EncounterKey, SafetyCheckService};

fn encounter_key((patient_id, encounter_id): (String, String)) -> EncounterKey {
    EncounterKey {
        patient_id,
        encounter_id,
    }
}

/// Evaluate the working list and make it the encounter's current check.
pub async fn evaluate(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Json(request) = payload?;
    let key = encounter_key(path);
    let outcome = ctx.engine.evaluate(&key, &request.medications)?;
    Ok(Json(CheckResponse::new(outcome)))
}

/// Override the flagged check. Blank reason or actor is a 400 and changes nothing.
pub async fn override_check(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
    payload: Result<Json<OverrideRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Json(request) = payload?;
    let key = encounter_key(path);
    let outcome = ctx
        .engine
        .override_check(&key, &request.reason, &request.actor)?;
    Ok(Json(CheckResponse::new(outcome)))
}

/// Drop the current check. Returns the gate afterwards, which stays blocked
/// when the dropped check was flagged.
pub async fn clear(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
) -> Result<Json<GateResponse>, ApiError> {
    let key = encounter_key(path);
    let gate = ctx.engine.clear(&key)?;
    Ok(Json(GateResponse::new(gate)))
}

pub async fn gate(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
) -> Result<Json<GateResponse>, ApiError> {
    let key = encounter_key(path);
    let gate = ctx.engine.gate(&key)?;
    Ok(Json(GateResponse::new(gate)))
}

pub async fn current(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
) -> Result<Json<CurrentCheckResponse>, ApiError> {
    let key = encounter_key(path);
    let check = ctx.engine.current_check(&key)?;
    let messages = check.as_ref().map(messages::summary).unwrap_or_default();
    Ok(Json(CurrentCheckResponse { check, messages }))
}

/// Overridden checks for the encounter, oldest first.
pub async fn history(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let key = encounter_key(path);
    let checks = ctx.engine.history(&key)?;
    Ok(Json(HistoryResponse { checks }))
}

/// Release the encounter's session. Recorded overrides stay in the audit trail.
pub async fn end(
    State(ctx): State<ApiContext>,
    Path(path): Path<(String, String)>,
) -> Result<Json<EndEncounterResponse>, ApiError> {
    let key = encounter_key(path);
    if !ctx.engine.end_encounter(&key)? {
        return Err(ApiError::NotFound(format!("no active session for encounter {key}")));
    }
    Ok(Json(EndEncounterResponse { ended: true }))
}
