//! Interaction lookup endpoint.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, InteractionQuery};
use crate::models::InteractionRule;
use crate::safety::messages;

#[derive(Serialize)]
pub struct InteractionResponse {
    pub interaction: Option<InteractionRule>,
    pub message: Option<String>,
}

/// `GET /api/interactions?drug_a=&drug_b=` — rule for a pair, in either order.
/// Names match exactly; an unknown pair is a normal `null` result.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    query: Result<Query<InteractionQuery>, QueryRejection>,
) -> Result<Json<InteractionResponse>, ApiError> {
    let Query(query) = query?;
    let drug_a = required("drug_a", query.drug_a)?;
    let drug_b = required("drug_b", query.drug_b)?;

    let interaction = ctx.engine.find_interaction(&drug_a, &drug_b)?;
    let message = interaction.as_ref().map(messages::interaction);

    Ok(Json(InteractionResponse {
        interaction,
        message,
    }))
}

fn required(name: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{name} is required"))),
    }
}
