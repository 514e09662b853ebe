use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::models::enums::CheckState;
use crate::models::{AllergyRecord, InteractionRule};

use super::allergies::AllergyRegistry;
use super::audit::{OverrideAudit, OverrideEvent, DEFAULT_FLUSH_THRESHOLD, MEMORY_RETENTION};
use super::gate::{self, CheckOutcome, GateDecision};
use super::knowledge::InteractionKnowledgeBase;
use super::session::CheckSession;
use super::severity::highest_severity;
use super::types::{EncounterKey, SafetyCheck, SafetyCheckService, SafetyError};

type SharedSession = Arc<Mutex<CheckSession>>;

/// Default implementation of the safety-check service.
///
/// Session state is partitioned per encounter. Each session sits behind its
/// own mutex so operations on one encounter are serialized while different
/// encounters proceed in parallel. The knowledge base and the allergy
/// registry are read-mostly and are snapshotted before a session is locked.
pub struct DefaultSafetyEngine {
    knowledge: RwLock<Arc<InteractionKnowledgeBase>>,
    allergies: RwLock<AllergyRegistry>,
    sessions: RwLock<HashMap<EncounterKey, SharedSession>>,
    audit: OverrideAudit,
    audit_db: Option<PathBuf>,
}

impl DefaultSafetyEngine {
    /// Engine with an in-memory audit buffer only.
    pub fn new(knowledge: InteractionKnowledgeBase) -> Self {
        Self::build(knowledge, None, DEFAULT_FLUSH_THRESHOLD)
    }

    /// Engine that flushes override events to the SQLite database at `path`.
    pub fn with_audit_db(
        knowledge: InteractionKnowledgeBase,
        path: &Path,
        flush_threshold: usize,
    ) -> Result<Self, SafetyError> {
        // Fail at startup, not at the first override.
        crate::db::open_database(path)?;
        Ok(Self::build(knowledge, Some(path.to_path_buf()), flush_threshold))
    }

    fn build(
        knowledge: InteractionKnowledgeBase,
        audit_db: Option<PathBuf>,
        flush_threshold: usize,
    ) -> Self {
        tracing::info!(
            rules = knowledge.len(),
            duplicates_skipped = knowledge.duplicates_skipped(),
            audit_persisted = audit_db.is_some(),
            "Safety engine initialized"
        );
        Self {
            knowledge: RwLock::new(Arc::new(knowledge)),
            allergies: RwLock::new(AllergyRegistry::new()),
            sessions: RwLock::new(HashMap::new()),
            audit: OverrideAudit::new(flush_threshold),
            audit_db,
        }
    }

    /// The rule set currently in effect.
    pub fn knowledge_base(&self) -> Result<Arc<InteractionKnowledgeBase>, SafetyError> {
        self.knowledge
            .read()
            .map(|kb| Arc::clone(&*kb))
            .map_err(|_| SafetyError::LockFailed)
    }

    /// Swap in a new rule set. Evaluations already under way finish against
    /// the old one; existing checks keep the rules they captured.
    pub fn reload_knowledge_base(
        &self,
        knowledge: InteractionKnowledgeBase,
    ) -> Result<(), SafetyError> {
        let rules = knowledge.len();
        let duplicates_skipped = knowledge.duplicates_skipped();
        let mut slot = self.knowledge.write().map_err(|_| SafetyError::LockFailed)?;
        *slot = Arc::new(knowledge);
        tracing::info!(rules, duplicates_skipped, "Interaction knowledge base reloaded");
        Ok(())
    }

    pub fn find_interaction(
        &self,
        drug_a: &str,
        drug_b: &str,
    ) -> Result<Option<InteractionRule>, SafetyError> {
        let kb = self.knowledge_base()?;
        Ok(kb.find_interaction(drug_a, drug_b).cloned())
    }

    pub fn allergies_for(&self, patient_id: &str) -> Result<Vec<AllergyRecord>, SafetyError> {
        let registry = self.allergies.read().map_err(|_| SafetyError::LockFailed)?;
        Ok(registry.allergies_for(patient_id).to_vec())
    }

    pub fn audit(&self) -> &OverrideAudit {
        &self.audit
    }

    /// Write buffered override events to the audit database. A no-op when
    /// persistence is disabled.
    pub fn flush_audit(&self) -> Result<usize, SafetyError> {
        let Some(path) = &self.audit_db else {
            return Ok(0);
        };
        let conn = crate::db::open_database(path)?;
        self.audit.flush_to_db(&conn)
    }

    pub fn active_encounters(&self) -> Result<usize, SafetyError> {
        self.sessions
            .read()
            .map(|s| s.len())
            .map_err(|_| SafetyError::LockFailed)
    }

    fn existing_session(&self, key: &EncounterKey) -> Result<Option<SharedSession>, SafetyError> {
        let sessions = self.sessions.read().map_err(|_| SafetyError::LockFailed)?;
        Ok(sessions.get(key).cloned())
    }

    fn session_or_create(&self, key: &EncounterKey) -> Result<SharedSession, SafetyError> {
        if let Some(session) = self.existing_session(key)? {
            return Ok(session);
        }
        let mut sessions = self.sessions.write().map_err(|_| SafetyError::LockFailed)?;
        let session = sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(CheckSession::new(key.clone()))));
        Ok(Arc::clone(session))
    }

    /// Run `f` against the session if it exists; unknown encounters get `default`.
    fn with_session<T>(
        &self,
        key: &EncounterKey,
        default: T,
        f: impl FnOnce(&CheckSession) -> T,
    ) -> Result<T, SafetyError> {
        match self.existing_session(key)? {
            Some(session) => {
                let session = session.lock().map_err(|_| SafetyError::LockFailed)?;
                Ok(f(&session))
            }
            None => Ok(default),
        }
    }

    /// Write the buffer out once the threshold is reached, or trim it when
    /// nothing is persisted. Failures leave the events buffered.
    fn after_override_recorded(&self, needs_flush: bool) {
        if self.audit_db.is_none() {
            if let Err(e) = self.audit.retain_latest(MEMORY_RETENTION) {
                tracing::warn!("Trimming in-memory override audit failed: {e}");
            }
        } else if needs_flush {
            if let Err(e) = self.flush_audit() {
                tracing::warn!("Auto-flush override audit failed: {e}");
            }
        }
    }
}

impl SafetyCheckService for DefaultSafetyEngine {
    fn set_allergies(
        &self,
        patient_id: &str,
        records: Vec<AllergyRecord>,
    ) -> Result<usize, SafetyError> {
        let mut registry = self.allergies.write().map_err(|_| SafetyError::LockFailed)?;
        Ok(registry.set_allergies(patient_id, records))
    }

    fn evaluate(&self, key: &EncounterKey, drugs: &[String]) -> Result<CheckOutcome, SafetyError> {
        let start = Instant::now();

        let knowledge = self.knowledge_base()?;
        let allergies = self.allergies_for(&key.patient_id)?;
        let session = self.session_or_create(key)?;
        let mut session = session.lock().map_err(|_| SafetyError::LockFailed)?;

        let check = session.evaluate(drugs, &allergies, &knowledge).clone();
        let outcome = CheckOutcome::of(&check, &session);
        let elapsed_us = start.elapsed().as_micros() as u64;

        tracing::info!(
            encounter = %key,
            check_id = %check.id(),
            drugs = drugs.len(),
            interactions = check.interactions().len(),
            warnings = check.warnings().len(),
            highest = highest_severity(&check).map(|s| s.as_str()).unwrap_or("none"),
            elapsed_us,
            "Safety check evaluated"
        );

        Ok(outcome)
    }

    fn override_check(
        &self,
        key: &EncounterKey,
        reason: &str,
        actor: &str,
    ) -> Result<CheckOutcome, SafetyError> {
        let session = self
            .existing_session(key)?
            .ok_or(SafetyError::NoFlaggedCheck)?;

        let (outcome, needs_flush) = {
            let mut session = session.lock().map_err(|_| SafetyError::LockFailed)?;
            let prepared = session.prepare_override(reason, actor)?;
            // Audit first: a failure here leaves the gate blocked.
            let needs_flush = self.audit.record(OverrideEvent::from_check(key, &prepared)?)?;
            let check = session.commit_override(prepared).clone();
            (CheckOutcome::of(&check, &session), needs_flush)
        };

        self.after_override_recorded(needs_flush);
        Ok(outcome)
    }

    fn clear(&self, key: &EncounterKey) -> Result<GateDecision, SafetyError> {
        let clean = GateDecision::Advance {
            state: CheckState::Clean,
        };
        match self.existing_session(key)? {
            Some(session) => {
                let mut session = session.lock().map_err(|_| SafetyError::LockFailed)?;
                session.clear();
                Ok(gate::decide(&session))
            }
            None => Ok(clean),
        }
    }

    fn end_encounter(&self, key: &EncounterKey) -> Result<bool, SafetyError> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| SafetyError::LockFailed)?
            .remove(key);

        if let Some(session) = &removed {
            let state = session
                .lock()
                .map(|s| s.state())
                .map_err(|_| SafetyError::LockFailed)?;
            tracing::info!(encounter = %key, state = state.as_str(), "Encounter session ended");
        }
        Ok(removed.is_some())
    }

    fn can_advance(&self, key: &EncounterKey) -> Result<bool, SafetyError> {
        self.with_session(key, true, CheckSession::can_advance)
    }

    fn gate(&self, key: &EncounterKey) -> Result<GateDecision, SafetyError> {
        let clean = GateDecision::Advance {
            state: CheckState::Clean,
        };
        self.with_session(key, clean, gate::decide)
    }

    fn state(&self, key: &EncounterKey) -> Result<CheckState, SafetyError> {
        self.with_session(key, CheckState::Clean, CheckSession::state)
    }

    fn current_check(&self, key: &EncounterKey) -> Result<Option<SafetyCheck>, SafetyError> {
        self.with_session(key, None, |s| s.current().cloned())
    }

    fn history(&self, key: &EncounterKey) -> Result<Vec<SafetyCheck>, SafetyError> {
        self.with_session(key, Vec::new(), |s| s.history().to_vec())
    }
}
