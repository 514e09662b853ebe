use serde::{Deserialize, Serialize};

use super::enums::InteractionSeverity;

/// A documented pharmacological conflict between two named drugs.
///
/// `drug1`/`drug2` are kept exactly as authored for display. Lookups treat
/// the pair as unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub drug1: String,
    pub drug2: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
}

impl InteractionRule {
    /// True if this rule covers the given pair, in either order.
    pub fn covers(&self, drug_a: &str, drug_b: &str) -> bool {
        (self.drug1 == drug_a && self.drug2 == drug_b)
            || (self.drug1 == drug_b && self.drug2 == drug_a)
    }
}
