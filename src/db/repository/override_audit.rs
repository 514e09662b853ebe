use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::SeverityLevel;
use crate::safety::audit::OverrideEvent;
use crate::safety::SafetyCheck;

const SELECT_COLUMNS: &str = "SELECT check_id, patient_id, encounter_id, actor, reason, recorded_at,
     highest_severity, interaction_count, warning_count, check_json
     FROM override_audit";

/// Insert a batch of override events in one transaction. Either every event
/// lands or none does.
pub fn insert_override_events(
    conn: &Connection,
    events: &[OverrideEvent],
) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO override_audit (check_id, patient_id, encounter_id, actor, reason,
             recorded_at, highest_severity, interaction_count, warning_count, check_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for event in events {
            let check_json = serde_json::to_string(&event.check)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            stmt.execute(params![
                event.check_id.to_string(),
                event.patient_id,
                event.encounter_id,
                event.actor,
                event.reason,
                event.recorded_at,
                event.highest_severity.map(|s| s.as_str()),
                event.interaction_count as i64,
                event.warning_count as i64,
                check_json,
            ])?;
        }
    }
    tx.commit()?;
    Ok(events.len())
}

/// All overrides recorded for a patient, oldest first.
pub fn query_overrides_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<OverrideEvent>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE patient_id = ?1 ORDER BY recorded_at ASC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(OverrideRow::into_event).collect()
}

/// The override recorded for one check, if any.
pub fn get_override_by_check(
    conn: &Connection,
    check_id: &Uuid,
) -> Result<Option<OverrideEvent>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE check_id = ?1"),
            params![check_id.to_string()],
            read_row,
        )
        .optional()?;

    row.map(OverrideRow::into_event).transpose()
}

pub fn count_overrides(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM override_audit", [], |row| row.get(0))?;
    Ok(count)
}

struct OverrideRow {
    check_id: String,
    patient_id: String,
    encounter_id: String,
    actor: String,
    reason: String,
    recorded_at: DateTime<Utc>,
    highest_severity: Option<String>,
    interaction_count: i64,
    warning_count: i64,
    check_json: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<OverrideRow> {
    Ok(OverrideRow {
        check_id: row.get(0)?,
        patient_id: row.get(1)?,
        encounter_id: row.get(2)?,
        actor: row.get(3)?,
        reason: row.get(4)?,
        recorded_at: row.get(5)?,
        highest_severity: row.get(6)?,
        interaction_count: row.get(7)?,
        warning_count: row.get(8)?,
        check_json: row.get(9)?,
    })
}

impl OverrideRow {
    /// Decode the stored snapshot. Snapshots go through the same override
    /// integrity checks as any other deserialized check.
    fn into_event(self) -> Result<OverrideEvent, DatabaseError> {
        let check_id = Uuid::parse_str(&self.check_id)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let check: SafetyCheck = serde_json::from_str(&self.check_json)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        if check.id() != check_id {
            return Err(DatabaseError::Serialization(format!(
                "snapshot id {} does not match row {}",
                check.id(),
                check_id
            )));
        }
        let highest_severity = self
            .highest_severity
            .as_deref()
            .map(SeverityLevel::from_str)
            .transpose()?;

        Ok(OverrideEvent {
            check_id,
            patient_id: self.patient_id,
            encounter_id: self.encounter_id,
            actor: self.actor,
            reason: self.reason,
            recorded_at: self.recorded_at,
            highest_severity,
            interaction_count: self.interaction_count.max(0) as usize,
            warning_count: self.warning_count.max(0) as usize,
            check,
        })
    }
}
