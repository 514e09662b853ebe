//! Override audit trail.
//!
//! Every successful override produces an `OverrideEvent`. Events are buffered
//! in memory and written to the `override_audit` table in batches. A failed
//! write leaves the batch in the buffer for the next flush.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::enums::SeverityLevel;

use super::severity::highest_severity;
use super::types::{EncounterKey, SafetyCheck, SafetyError};

/// Flush after every override unless configured otherwise.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1;

/// Events kept in memory when no audit database is configured.
pub const MEMORY_RETENTION: usize = 1024;

/// One override decision, with the full check snapshot it resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideEvent {
    pub check_id: Uuid,
    pub patient_id: String,
    pub encounter_id: String,
    pub actor: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    pub highest_severity: Option<SeverityLevel>,
    pub interaction_count: usize,
    pub warning_count: usize,
    pub check: SafetyCheck,
}

impl OverrideEvent {
    /// Build the event for an overridden check. Fails on a check that is not
    /// overridden.
    pub fn from_check(key: &EncounterKey, check: &SafetyCheck) -> Result<Self, SafetyError> {
        let record = check.override_record().ok_or_else(|| {
            SafetyError::Integrity(format!("check {} is not overridden", check.id()))
        })?;

        Ok(Self {
            check_id: check.id(),
            patient_id: key.patient_id.clone(),
            encounter_id: key.encounter_id.clone(),
            actor: record.actor.clone(),
            reason: record.reason.clone(),
            recorded_at: record.recorded_at,
            highest_severity: highest_severity(check),
            interaction_count: check.interactions().len(),
            warning_count: check.warnings().len(),
            check: check.clone(),
        })
    }
}

/// In-memory override buffer.
pub struct OverrideAudit {
    buffer: Mutex<Vec<OverrideEvent>>,
    flush_threshold: usize,
}

impl OverrideAudit {
    pub fn new(flush_threshold: usize) -> Self {
        let flush_threshold = flush_threshold.max(1);
        Self {
            buffer: Mutex::new(Vec::with_capacity(flush_threshold)),
            flush_threshold,
        }
    }

    /// Buffer an event. Returns `true` once the buffer has reached the flush threshold.
    pub fn record(&self, event: OverrideEvent) -> Result<bool, SafetyError> {
        let mut buf = self.buffer.lock().map_err(|_| SafetyError::LockFailed)?;
        buf.push(event);
        Ok(buf.len() >= self.flush_threshold)
    }

    /// Buffered events (for testing or inspection).
    pub fn entries(&self) -> Vec<OverrideEvent> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Drain all buffered events.
    pub fn drain(&self) -> Vec<OverrideEvent> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Drop the oldest events beyond `max`. Returns how many were dropped.
    pub fn retain_latest(&self, max: usize) -> Result<usize, SafetyError> {
        let mut buf = self.buffer.lock().map_err(|_| SafetyError::LockFailed)?;
        let excess = buf.len().saturating_sub(max);
        if excess > 0 {
            buf.drain(..excess);
            tracing::warn!(
                dropped = excess,
                retained = buf.len(),
                "Override audit not persisted, oldest in-memory events dropped"
            );
        }
        Ok(excess)
    }

    /// Write buffered events to SQLite. On failure the events go back to the
    /// front of the buffer, ahead of anything recorded meanwhile.
    pub fn flush_to_db(&self, conn: &rusqlite::Connection) -> Result<usize, SafetyError> {
        let events = self.drain();
        if events.is_empty() {
            return Ok(0);
        }

        match crate::db::repository::insert_override_events(conn, &events) {
            Ok(count) => {
                tracing::debug!(count, "Flushed override events to database");
                Ok(count)
            }
            Err(e) => {
                let pending = events.len();
                let mut buf = self.buffer.lock().map_err(|_| SafetyError::LockFailed)?;
                buf.splice(0..0, events);
                tracing::warn!(pending, "Override audit flush failed, events kept in buffer");
                Err(e.into())
            }
        }
    }
}

impl Default for OverrideAudit {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_THRESHOLD)
    }
}
