use crate::models::enums::{AllergySeverity, InteractionSeverity, SeverityLevel};

use super::types::SafetyCheck;

impl SeverityLevel {
    /// 1 (minor/mild) through 4 (contraindicated).
    pub fn rank(self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Major => 3,
            Self::Contraindicated => 4,
        }
    }
}

impl From<InteractionSeverity> for SeverityLevel {
    fn from(severity: InteractionSeverity) -> Self {
        match severity {
            InteractionSeverity::Minor => Self::Minor,
            InteractionSeverity::Moderate => Self::Moderate,
            InteractionSeverity::Major => Self::Major,
            InteractionSeverity::Contraindicated => Self::Contraindicated,
        }
    }
}

impl From<AllergySeverity> for SeverityLevel {
    fn from(severity: AllergySeverity) -> Self {
        match severity {
            AllergySeverity::Mild => Self::Minor,
            AllergySeverity::Moderate => Self::Moderate,
            AllergySeverity::Severe => Self::Major,
        }
    }
}

/// Highest severity across a check's interactions and allergy warnings.
///
/// `None` when the check has no findings: there is no default level.
pub fn highest_severity(check: &SafetyCheck) -> Option<SeverityLevel> {
    let from_interactions = check
        .interactions()
        .iter()
        .map(|r| SeverityLevel::from(r.severity));
    let from_warnings = check
        .warnings()
        .iter()
        .map(|w| SeverityLevel::from(w.severity));

    from_interactions.chain(from_warnings).max()
}
