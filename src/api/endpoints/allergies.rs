//! Allergy registry endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SetAllergiesRequest, SetAllergiesResponse};
use crate::safety::SafetyCheckService;

/// `PUT /api/patients/:patient_id/allergies` — replace the patient's full list.
/// Records with a blank allergen are dropped; `stored` reports what was kept.
pub async fn replace(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
    payload: Result<Json<SetAllergiesRequest>, JsonRejection>,
) -> Result<Json<SetAllergiesResponse>, ApiError> {
    let Json(request) = payload?;
    let stored = ctx.engine.set_allergies(&patient_id, request.allergies)?;
    Ok(Json(SetAllergiesResponse { patient_id, stored }))
}
