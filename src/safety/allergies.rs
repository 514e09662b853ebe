use std::collections::HashMap;

use crate::models::AllergyRecord;

/// Case-insensitive substring containment of `allergen` within `drug_name`.
///
/// Permissive on purpose: "Penicillin V" matches "Penicillin". It can also
/// match unrelated drugs that share a substring and it misses brand names and
/// misspellings. Blank allergens never match.
pub fn matches(drug_name: &str, allergen: &str) -> bool {
    if allergen.trim().is_empty() {
        return false;
    }
    drug_name
        .to_lowercase()
        .contains(&allergen.to_lowercase())
}

/// Per-patient allergy lists, pushed in by the care-record provider.
#[derive(Debug, Default)]
pub struct AllergyRegistry {
    by_patient: HashMap<String, Vec<AllergyRecord>>,
}

impl AllergyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the patient's full list (last write wins). Records with a blank
    /// allergen are dropped. Returns the number of records stored.
    pub fn set_allergies(&mut self, patient_id: &str, records: Vec<AllergyRecord>) -> usize {
        let total = records.len();
        let kept: Vec<AllergyRecord> = records
            .into_iter()
            .filter(|r| !r.allergen.trim().is_empty())
            .collect();

        let dropped = total - kept.len();
        if dropped > 0 {
            tracing::warn!(
                patient_id,
                dropped,
                "Blank allergy records dropped"
            );
        }

        let stored = kept.len();
        self.by_patient.insert(patient_id.to_string(), kept);
        tracing::debug!(patient_id, stored, "Allergy list replaced");
        stored
    }

    /// The patient's recorded allergies. Unknown patients have none.
    pub fn allergies_for(&self, patient_id: &str) -> &[AllergyRecord] {
        self.by_patient
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
