use chrono::Utc;

use crate::models::enums::CheckState;
use crate::models::AllergyRecord;

use super::evaluator;
use super::knowledge::InteractionKnowledgeBase;
use super::types::{validate_override, EncounterKey, SafetyCheck, SafetyError};

/// Check state for one active encounter.
///
/// Holds at most one current check plus an append-only history of overridden
/// checks. A flagged check that is cleared without an override stays
/// outstanding so the gate keeps blocking until a new evaluation or an
/// override resolves it.
#[derive(Debug)]
pub struct CheckSession {
    key: EncounterKey,
    current: Option<SafetyCheck>,
    outstanding: Option<SafetyCheck>,
    history: Vec<SafetyCheck>,
}

impl CheckSession {
    pub fn new(key: EncounterKey) -> Self {
        Self {
            key,
            current: None,
            outstanding: None,
            history: Vec::new(),
        }
    }

    pub fn key(&self) -> &EncounterKey {
        &self.key
    }

    pub fn current(&self) -> Option<&SafetyCheck> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[SafetyCheck] {
        &self.history
    }

    /// The check holding the gate shut, if any.
    pub fn blocking_check(&self) -> Option<&SafetyCheck> {
        match &self.current {
            Some(check) if check.is_flagged() => Some(check),
            Some(_) => None,
            None => self.outstanding.as_ref(),
        }
    }

    pub fn state(&self) -> CheckState {
        match &self.current {
            Some(check) if check.overridden() => CheckState::Overridden,
            Some(check) if check.has_findings() => CheckState::Flagged,
            Some(_) => CheckState::Clean,
            None if self.outstanding.is_some() => CheckState::Flagged,
            None => CheckState::Clean,
        }
    }

    /// True iff Clean or Overridden.
    pub fn can_advance(&self) -> bool {
        self.state() != CheckState::Flagged
    }

    /// Evaluate the working list against the given allergy snapshot and rule
    /// set, and make the result the current check.
    pub fn evaluate<D: AsRef<str>>(
        &mut self,
        drugs: &[D],
        allergies: &[AllergyRecord],
        knowledge: &InteractionKnowledgeBase,
    ) -> &SafetyCheck {
        let check = evaluator::evaluate(&self.key.patient_id, drugs, allergies, knowledge);
        self.record_evaluation(check)
    }

    /// Replace the current check. Unresolved flagged checks that get
    /// superseded are discarded; overridden ones are already in history.
    pub fn record_evaluation(&mut self, check: SafetyCheck) -> &SafetyCheck {
        let superseded = self.current.take().into_iter().chain(self.outstanding.take());
        for old in superseded.filter(SafetyCheck::is_flagged) {
            tracing::debug!(
                check_id = %old.id(),
                findings = old.finding_count(),
                "Superseded unresolved check discarded"
            );
        }

        self.current.insert(check)
    }

    /// Drop the current check.
    ///
    /// Clearing a flagged check is allowed but does not resolve it: the check
    /// stays outstanding and `can_advance` keeps returning false.
    pub fn clear(&mut self) {
        if let Some(check) = self.current.take() {
            if check.is_flagged() {
                tracing::warn!(
                    check_id = %check.id(),
                    findings = check.finding_count(),
                    "Flagged check cleared without override, gate stays blocked"
                );
                self.outstanding = Some(check);
            }
        }
    }

    /// Override the blocking check. On success the check becomes current in
    /// the Overridden state and a copy is appended to history. On failure
    /// nothing changes.
    pub fn override_check(
        &mut self,
        reason: &str,
        actor: &str,
    ) -> Result<&SafetyCheck, SafetyError> {
        let check = self.prepare_override(reason, actor)?;
        Ok(self.commit_override(check))
    }

    /// The blocking check with the override applied. The session itself is
    /// untouched until `commit_override`.
    pub fn prepare_override(&self, reason: &str, actor: &str) -> Result<SafetyCheck, SafetyError> {
        validate_override(reason, actor)?;
        let mut check = self
            .blocking_check()
            .cloned()
            .ok_or(SafetyError::NoFlaggedCheck)?;
        check.apply_override(reason, actor, Utc::now())?;
        Ok(check)
    }

    /// Make a prepared override current and append it to history.
    pub(crate) fn commit_override(&mut self, check: SafetyCheck) -> &SafetyCheck {
        self.outstanding = None;
        self.history.push(check.clone());

        tracing::info!(
            check_id = %check.id(),
            findings = check.finding_count(),
            history_len = self.history.len(),
            "Safety check overridden"
        );

        self.current.insert(check)
    }
}
