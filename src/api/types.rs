//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::enums::{CheckState, SeverityLevel};
use crate::models::AllergyRecord;
use crate::safety::severity::highest_severity;
use crate::safety::{messages, CheckOutcome, DefaultSafetyEngine, GateDecision, SafetyCheck};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub engine: Arc<DefaultSafetyEngine>,
}

impl ApiContext {
    pub fn new(engine: Arc<DefaultSafetyEngine>) -> Self {
        Self { engine }
    }
}

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct InteractionQuery {
    pub drug_a: Option<String>,
    pub drug_b: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetAllergiesRequest {
    pub allergies: Vec<AllergyRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub medications: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub reason: String,
    pub actor: String,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct SetAllergiesResponse {
    pub patient_id: String,
    pub stored: usize,
}

/// A check together with what the workflow needs to present it.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub check: SafetyCheck,
    pub state: CheckState,
    pub can_advance: bool,
    pub highest_severity: Option<SeverityLevel>,
    pub messages: Vec<String>,
}

impl CheckResponse {
    pub fn new(outcome: CheckOutcome) -> Self {
        Self {
            highest_severity: highest_severity(&outcome.check),
            messages: messages::summary(&outcome.check),
            state: outcome.state(),
            can_advance: outcome.can_advance(),
            check: outcome.check,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentCheckResponse {
    pub check: Option<SafetyCheck>,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GateResponse {
    pub can_advance: bool,
    pub state: CheckState,
    pub gate: GateDecision,
}

impl GateResponse {
    pub fn new(gate: GateDecision) -> Self {
        Self {
            can_advance: gate.can_advance(),
            state: gate.state(),
            gate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndEncounterResponse {
    pub ended: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub checks: Vec<SafetyCheck>,
}
