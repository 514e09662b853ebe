//! Workflow gate: the contract the encounter workflow checks before it leaves
//! the medication-entry step.
//!
//! Gating is binary. Any unresolved interaction or allergy finding blocks,
//! whatever its severity; severity is reported only so the caller can choose
//! how loudly to present the block.

use serde::Serialize;

use crate::models::enums::{CheckState, SeverityLevel};

use super::session::CheckSession;
use super::severity::highest_severity;
use super::types::{SafetyCheck, SafetyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Clean or Overridden.
    Advance { state: CheckState },
    /// Flagged: findings exist and nobody has overridden them.
    Blocked {
        interactions: usize,
        warnings: usize,
        highest_severity: Option<SeverityLevel>,
    },
}

impl GateDecision {
    pub fn can_advance(&self) -> bool {
        matches!(self, Self::Advance { .. })
    }

    /// Session state the decision was taken in.
    pub fn state(&self) -> CheckState {
        match self {
            Self::Advance { state } => *state,
            Self::Blocked { .. } => CheckState::Flagged,
        }
    }
}

/// A check and the gate decision taken under the same session lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub check: SafetyCheck,
    pub gate: GateDecision,
}

impl CheckOutcome {
    /// Pair the session's current check with its gate decision.
    pub fn of(check: &SafetyCheck, session: &CheckSession) -> Self {
        Self {
            check: check.clone(),
            gate: decide(session),
        }
    }

    pub fn state(&self) -> CheckState {
        self.gate.state()
    }

    pub fn can_advance(&self) -> bool {
        self.gate.can_advance()
    }
}

/// Decide whether the session may advance past the medication step.
pub fn decide(session: &CheckSession) -> GateDecision {
    match session.blocking_check() {
        Some(check) => GateDecision::Blocked {
            interactions: check.interactions().len(),
            warnings: check.warnings().len(),
            highest_severity: highest_severity(check),
        },
        None => GateDecision::Advance {
            state: session.state(),
        },
    }
}

/// `Ok(())` when the workflow may advance, `GateBlocked` otherwise.
pub fn ensure_can_advance(session: &CheckSession) -> Result<(), SafetyError> {
    match decide(session) {
        GateDecision::Advance { .. } => Ok(()),
        GateDecision::Blocked {
            interactions,
            warnings,
            highest_severity,
        } => {
            tracing::info!(
                encounter = %session.key(),
                interactions,
                warnings,
                highest = highest_severity.map(|s| s.as_str()).unwrap_or("none"),
                "Workflow gate blocked"
            );
            Err(SafetyError::GateBlocked {
                interactions,
                warnings,
            })
        }
    }
}
