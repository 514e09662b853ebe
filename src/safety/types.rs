use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AllergySeverity, CheckState};
use crate::models::{AllergyRecord, InteractionRule};

use super::gate::{CheckOutcome, GateDecision};

// ---------------------------------------------------------------------------
// EncounterKey
// ---------------------------------------------------------------------------

/// Partition key for check session state: one patient in one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterKey {
    pub patient_id: String,
    pub encounter_id: String,
}

impl EncounterKey {
    pub fn new(patient_id: &str, encounter_id: &str) -> Self {
        Self {
            patient_id: patient_id.into(),
            encounter_id: encounter_id.into(),
        }
    }
}

impl std::fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.patient_id, self.encounter_id)
    }
}

// ---------------------------------------------------------------------------
// AllergyWarning
// ---------------------------------------------------------------------------

/// A drug on the working list matched one of the patient's recorded allergens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyWarning {
    /// The drug name exactly as evaluated.
    pub drug: String,
    pub allergen: String,
    pub reaction: String,
    pub severity: AllergySeverity,
}

impl AllergyWarning {
    pub fn new(drug: &str, allergy: &AllergyRecord) -> Self {
        Self {
            drug: drug.into(),
            allergen: allergy.allergen.clone(),
            reaction: allergy.reaction.clone(),
            severity: allergy.severity,
        }
    }
}

// ---------------------------------------------------------------------------
// OverrideRecord
// ---------------------------------------------------------------------------

/// Who overrode a flagged check, why, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub reason: String,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

/// Validate override input. Returns the trimmed (reason, actor).
pub fn validate_override<'a>(
    reason: &'a str,
    actor: &'a str,
) -> Result<(&'a str, &'a str), SafetyError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(SafetyError::EmptyOverrideReason);
    }
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(SafetyError::MissingActor);
    }
    Ok((reason, actor))
}

// ---------------------------------------------------------------------------
// SafetyCheck
// ---------------------------------------------------------------------------

/// The result of evaluating one medication list.
///
/// Rules and allergies are held by value: a check keeps describing what was
/// known at evaluation time even after the knowledge base or the patient's
/// allergy list changes.
///
/// An overridden check always carries a non-empty reason. Fields are private
/// so the only ways to reach the overridden state are `apply_override` and
/// deserialization, and both validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SafetyCheckRecord", try_from = "SafetyCheckRecord")]
pub struct SafetyCheck {
    id: Uuid,
    patient_id: String,
    medications: Vec<String>,
    interactions: Vec<InteractionRule>,
    warnings: Vec<AllergyWarning>,
    checked_at: DateTime<Utc>,
    override_record: Option<OverrideRecord>,
}

impl SafetyCheck {
    pub(crate) fn new(
        patient_id: &str,
        medications: Vec<String>,
        interactions: Vec<InteractionRule>,
        warnings: Vec<AllergyWarning>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            medications,
            interactions,
            warnings,
            checked_at,
            override_record: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn medications(&self) -> &[String] {
        &self.medications
    }

    pub fn interactions(&self) -> &[InteractionRule] {
        &self.interactions
    }

    pub fn warnings(&self) -> &[AllergyWarning] {
        &self.warnings
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub fn overridden(&self) -> bool {
        self.override_record.is_some()
    }

    pub fn override_reason(&self) -> Option<&str> {
        self.override_record.as_ref().map(|o| o.reason.as_str())
    }

    pub fn override_record(&self) -> Option<&OverrideRecord> {
        self.override_record.as_ref()
    }

    pub fn has_findings(&self) -> bool {
        !self.interactions.is_empty() || !self.warnings.is_empty()
    }

    pub fn finding_count(&self) -> usize {
        self.interactions.len() + self.warnings.len()
    }

    /// Has findings and nobody has overridden them yet.
    pub fn is_flagged(&self) -> bool {
        self.has_findings() && !self.overridden()
    }

    /// Mark this check overridden. Fails without touching the check if the
    /// input is blank or the check is not flagged.
    pub(crate) fn apply_override(
        &mut self,
        reason: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SafetyError> {
        let (reason, actor) = validate_override(reason, actor)?;
        if !self.is_flagged() {
            return Err(SafetyError::NoFlaggedCheck);
        }
        self.override_record = Some(OverrideRecord {
            reason: reason.into(),
            actor: actor.into(),
            recorded_at: at,
        });
        Ok(())
    }
}

/// Serialized shape of a `SafetyCheck`: flat override fields, as consumed by
/// prescription submission and the audit table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SafetyCheckRecord {
    id: Uuid,
    patient_id: String,
    medications: Vec<String>,
    interactions: Vec<InteractionRule>,
    warnings: Vec<AllergyWarning>,
    checked_at: DateTime<Utc>,
    overridden: bool,
    #[serde(default)]
    override_reason: Option<String>,
    #[serde(default)]
    overridden_by: Option<String>,
    #[serde(default)]
    overridden_at: Option<DateTime<Utc>>,
}

impl From<SafetyCheck> for SafetyCheckRecord {
    fn from(check: SafetyCheck) -> Self {
        let overridden = check.overridden();
        let (override_reason, overridden_by, overridden_at) = match check.override_record {
            Some(o) => (Some(o.reason), Some(o.actor), Some(o.recorded_at)),
            None => (None, None, None),
        };
        Self {
            id: check.id,
            patient_id: check.patient_id,
            medications: check.medications,
            interactions: check.interactions,
            warnings: check.warnings,
            checked_at: check.checked_at,
            overridden,
            override_reason,
            overridden_by,
            overridden_at,
        }
    }
}

impl TryFrom<SafetyCheckRecord> for SafetyCheck {
    type Error = SafetyError;

    fn try_from(record: SafetyCheckRecord) -> Result<Self, Self::Error> {
        let override_record = if record.overridden {
            let reason = record
                .override_reason
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| {
                    SafetyError::Integrity(format!("check {} overridden without a reason", record.id))
                })?;
            let actor = record
                .overridden_by
                .filter(|a| !a.trim().is_empty())
                .ok_or_else(|| {
                    SafetyError::Integrity(format!("check {} overridden without an actor", record.id))
                })?;
            let recorded_at = record.overridden_at.ok_or_else(|| {
                SafetyError::Integrity(format!("check {} overridden without a timestamp", record.id))
            })?;
            if record.interactions.is_empty() && record.warnings.is_empty() {
                return Err(SafetyError::Integrity(format!(
                    "check {} overridden with no findings",
                    record.id
                )));
            }
            Some(OverrideRecord {
                reason,
                actor,
                recorded_at,
            })
        } else {
            if record.override_reason.is_some()
                || record.overridden_by.is_some()
                || record.overridden_at.is_some()
            {
                return Err(SafetyError::Integrity(format!(
                    "check {} carries override fields but is not overridden",
                    record.id
                )));
            }
            None
        };

        Ok(Self {
            id: record.id,
            patient_id: record.patient_id,
            medications: record.medications,
            interactions: record.interactions,
            warnings: record.warnings,
            checked_at: record.checked_at,
            override_record,
        })
    }
}

// ---------------------------------------------------------------------------
// SafetyError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Override requires a non-empty reason")]
    EmptyOverrideReason,

    #[error("Override requires an acting clinician")]
    MissingActor,

    #[error("No flagged safety check to override")]
    NoFlaggedCheck,

    #[error("Medication step blocked: {interactions} interaction(s), {warnings} allergy warning(s) unresolved")]
    GateBlocked { interactions: usize, warnings: usize },

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Knowledge base load failed ({0}): {1}")]
    KnowledgeBaseLoad(String, String),

    #[error("Knowledge base parse failed ({0}): {1}")]
    KnowledgeBaseParse(String, String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal lock failed")]
    LockFailed,
}

impl SafetyError {
    /// Caller-correctable input problems. State is never changed when these are returned.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyOverrideReason | Self::MissingActor | Self::NoFlaggedCheck
        )
    }
}

// ---------------------------------------------------------------------------
// SafetyCheckService trait
// ---------------------------------------------------------------------------

/// Operations the encounter workflow and medication-entry surface call.
pub trait SafetyCheckService {
    /// Replace the full allergy list for a patient. Returns the number of records kept.
    fn set_allergies(
        &self,
        patient_id: &str,
        records: Vec<AllergyRecord>,
    ) -> Result<usize, SafetyError>;

    /// Evaluate the clinician's working list and make it the encounter's
    /// current check. The gate decision is taken under the same lock.
    fn evaluate(&self, key: &EncounterKey, drugs: &[String]) -> Result<CheckOutcome, SafetyError>;

    /// Override the encounter's flagged check with a documented justification.
    /// The override is in the audit buffer before the gate opens.
    fn override_check(
        &self,
        key: &EncounterKey,
        reason: &str,
        actor: &str,
    ) -> Result<CheckOutcome, SafetyError>;

    /// Drop the encounter's current check and report the gate afterwards.
    fn clear(&self, key: &EncounterKey) -> Result<GateDecision, SafetyError>;

    /// Release the encounter's session once the workflow is done with it.
    /// Returns whether one existed.
    fn end_encounter(&self, key: &EncounterKey) -> Result<bool, SafetyError>;

    /// Gate query: may the workflow leave the medication step?
    fn can_advance(&self, key: &EncounterKey) -> Result<bool, SafetyError>;

    /// Gate query with the reason for a block.
    fn gate(&self, key: &EncounterKey) -> Result<GateDecision, SafetyError>;

    fn state(&self, key: &EncounterKey) -> Result<CheckState, SafetyError>;

    fn current_check(&self, key: &EncounterKey) -> Result<Option<SafetyCheck>, SafetyError>;

    fn history(&self, key: &EncounterKey) -> Result<Vec<SafetyCheck>, SafetyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::InteractionSeverity;

    fn flagged_check() -> SafetyCheck {
        SafetyCheck::new(
            "patient-1",
            vec!["Warfarin".into(), "Aspirin".into()],
            vec![InteractionRule {
                drug1: "Warfarin".into(),
                drug2: "Aspirin".into(),
                severity: InteractionSeverity::Major,
                description: "Increased bleeding risk".into(),
                mechanism: "Additive effects on hemostasis".into(),
                clinical_effect: "Bleeding".into(),
                management: "Avoid or monitor INR closely".into(),
            }],
            vec![],
            Utc::now(),
        )
    }

    #[test]
    fn new_check_is_not_overridden() {
        let check = flagged_check();
        assert!(!check.overridden());
        assert!(check.override_reason().is_none());
        assert!(check.is_flagged());
    }

    #[test]
    fn apply_override_trims_reason() {
        let mut check = flagged_check();
        check
            .apply_override("  monitored closely  ", "dr-lee", Utc::now())
            .unwrap();
        assert_eq!(check.override_reason(), Some("monitored closely"));
        assert_eq!(check.override_record().unwrap().actor, "dr-lee");
    }

    #[test]
    fn apply_override_blank_reason_leaves_check_untouched() {
        let mut check = flagged_check();
        for reason in ["", "   ", "\t\n"] {
            let err = check.apply_override(reason, "dr-lee", Utc::now()).unwrap_err();
            assert!(matches!(err, SafetyError::EmptyOverrideReason));
            assert!(err.is_validation());
        }
        assert!(!check.overridden());
    }

    #[test]
    fn apply_override_requires_actor() {
        let mut check = flagged_check();
        let err = check.apply_override("needed", " ", Utc::now()).unwrap_err();
        assert!(matches!(err, SafetyError::MissingActor));
        assert!(!check.overridden());
    }

    #[test]
    fn apply_override_twice_fails() {
        let mut check = flagged_check();
        check.apply_override("first", "dr-lee", Utc::now()).unwrap();
        let err = check.apply_override("second", "dr-lee", Utc::now()).unwrap_err();
        assert!(matches!(err, SafetyError::NoFlaggedCheck));
        assert_eq!(check.override_reason(), Some("first"));
    }

    #[test]
    fn apply_override_on_clean_check_fails() {
        let mut check = SafetyCheck::new("p", vec!["Acetaminophen".into()], vec![], vec![], Utc::now());
        let err = check.apply_override("why", "dr-lee", Utc::now()).unwrap_err();
        assert!(matches!(err, SafetyError::NoFlaggedCheck));
    }

    #[test]
    fn serialized_shape_has_flat_override_fields() {
        let mut check = flagged_check();
        check.apply_override("benefit outweighs risk", "dr-lee", Utc::now()).unwrap();
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["overridden"], true);
        assert_eq!(json["override_reason"], "benefit outweighs risk");
        assert_eq!(json["overridden_by"], "dr-lee");
        assert_eq!(json["interactions"][0]["severity"], "major");

        let back: SafetyCheck = serde_json::from_value(json).unwrap();
        assert_eq!(back, check);
    }

    #[test]
    fn deserializing_overridden_without_reason_is_rejected() {
        let check = flagged_check();
        let mut json = serde_json::to_value(&check).unwrap();
        json["overridden"] = serde_json::Value::Bool(true);
        json["override_reason"] = serde_json::Value::String("   ".into());
        json["overridden_by"] = serde_json::Value::String("dr-lee".into());
        json["overridden_at"] = serde_json::to_value(Utc::now()).unwrap();

        let result: Result<SafetyCheck, _> = serde_json::from_value(json);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("without a reason"), "unexpected error: {err}");
    }

    #[test]
    fn deserializing_stray_override_fields_is_rejected() {
        let check = flagged_check();
        let mut json = serde_json::to_value(&check).unwrap();
        json["override_reason"] = serde_json::Value::String("sneaky".into());
        let result: Result<SafetyCheck, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn encounter_key_display() {
        assert_eq!(EncounterKey::new("p1", "e9").to_string(), "p1/e9");
    }

    #[test]
    fn validation_family() {
        assert!(SafetyError::NoFlaggedCheck.is_validation());
        assert!(!SafetyError::LockFailed.is_validation());
        assert!(!SafetyError::Integrity("x".into()).is_validation());
    }
}
