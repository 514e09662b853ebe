use serde::{Deserialize, Serialize};

use super::enums::AllergySeverity;

/// A known patient allergy as supplied by the care-record provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyRecord {
    pub allergen: String,
    pub reaction: String,
    pub severity: AllergySeverity,
}

impl AllergyRecord {
    pub fn new(allergen: &str, reaction: &str, severity: AllergySeverity) -> Self {
        Self {
            allergen: allergen.into(),
            reaction: reaction.into(),
            severity,
        }
    }
}
