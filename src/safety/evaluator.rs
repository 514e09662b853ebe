use chrono::Utc;

use crate::models::{AllergyRecord, InteractionRule};

use super::allergies;
use super::knowledge::InteractionKnowledgeBase;
use super::types::{AllergyWarning, SafetyCheck};

/// Every unordered pair (i < j) with a rule, in list order.
/// Repeated entries are not collapsed.
pub fn find_interactions<D: AsRef<str>>(
    drugs: &[D],
    knowledge: &InteractionKnowledgeBase,
) -> Vec<InteractionRule> {
    let mut found = Vec::new();
    for (i, drug_a) in drugs.iter().enumerate() {
        for drug_b in &drugs[i + 1..] {
            if let Some(rule) = knowledge.find_interaction(drug_a.as_ref(), drug_b.as_ref()) {
                found.push(rule.clone());
            }
        }
    }
    found
}

/// One warning per (drug, allergy) match, drugs in list order then allergies in registry order.
pub fn find_allergy_warnings<D: AsRef<str>>(
    drugs: &[D],
    allergies: &[AllergyRecord],
) -> Vec<AllergyWarning> {
    let mut warnings = Vec::new();
    for drug in drugs {
        let drug = drug.as_ref();
        for allergy in allergies {
            if allergies::matches(drug, &allergy.allergen) {
                warnings.push(AllergyWarning::new(drug, allergy));
            }
        }
    }
    warnings
}

/// Evaluate a working medication list.
///
/// Pure: the result depends only on the arguments plus the clock. Unknown
/// drugs and an empty allergy list are the normal no-finding outcome, so this
/// never fails. An empty allergy list is treated as "no allergies known".
pub fn evaluate<D: AsRef<str>>(
    patient_id: &str,
    drugs: &[D],
    allergies: &[AllergyRecord],
    knowledge: &InteractionKnowledgeBase,
) -> SafetyCheck {
    let interactions = find_interactions(drugs, knowledge);
    let warnings = find_allergy_warnings(drugs, allergies);
    let medications = drugs.iter().map(|d| d.as_ref().to_string()).collect();

    SafetyCheck::new(patient_id, medications, interactions, warnings, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{AllergySeverity, InteractionSeverity};
    use crate::safety::knowledge::tests::{rule, test_base};

    fn penicillin_allergy() -> Vec<AllergyRecord> {
        vec![AllergyRecord::new(
            "Penicillin",
            "Anaphylaxis",
            AllergySeverity::Severe,
        )]
    }

    #[test]
    fn warfarin_aspirin_single_major_interaction() {
        let check = evaluate("p1", &["Warfarin", "Aspirin"], &[], &test_base());
        assert_eq!(check.interactions().len(), 1);
        assert_eq!(check.interactions()[0].severity, InteractionSeverity::Major);
        assert!(check.warnings().is_empty());
    }

    #[test]
    fn reversed_list_finds_same_rule() {
        let base = test_base();
        let forward = evaluate("p1", &["Warfarin", "Aspirin"], &[], &base);
        let reverse = evaluate("p1", &["Aspirin", "Warfarin"], &[], &base);
        assert_eq!(forward.interactions(), reverse.interactions());
    }

    #[test]
    fn penicillin_v_warns_with_registered_reaction() {
        let check = evaluate("p1", &["Penicillin V"], &penicillin_allergy(), &test_base());
        assert_eq!(check.warnings().len(), 1);
        let warning = &check.warnings()[0];
        assert_eq!(warning.drug, "Penicillin V");
        assert_eq!(warning.allergen, "Penicillin");
        assert_eq!(warning.reaction, "Anaphylaxis");
        assert_eq!(warning.severity, AllergySeverity::Severe);
    }

    #[test]
    fn lowercase_drug_still_warns() {
        let check = evaluate("p1", &["penicillin v"], &penicillin_allergy(), &test_base());
        assert_eq!(check.warnings().len(), 1);
        assert_eq!(check.warnings()[0].drug, "penicillin v");
    }

    #[test]
    fn acetaminophen_alone_is_clean() {
        let check = evaluate("p1", &["Acetaminophen"], &[], &test_base());
        assert!(check.interactions().is_empty());
        assert!(check.warnings().is_empty());
        assert!(!check.has_findings());
        assert!(!check.overridden());
        assert!(check.override_reason().is_none());
    }

    #[test]
    fn empty_list_is_clean() {
        let drugs: [&str; 0] = [];
        let check = evaluate("p1", &drugs, &penicillin_allergy(), &test_base());
        assert!(!check.has_findings());
        assert!(check.medications().is_empty());
    }

    #[test]
    fn duplicates_are_evaluated_as_given() {
        let check = evaluate(
            "p1",
            &["Warfarin", "Aspirin", "Aspirin"],
            &[],
            &test_base(),
        );
        // (0,1) and (0,2) both hit; (1,2) is Aspirin/Aspirin with no rule.
        assert_eq!(check.interactions().len(), 2);
        assert_eq!(check.medications().len(), 3);
    }

    #[test]
    fn interactions_follow_pair_order() {
        let base = InteractionKnowledgeBase::from_rules(vec![
            rule("B", "C", InteractionSeverity::Minor),
            rule("A", "C", InteractionSeverity::Major),
            rule("A", "B", InteractionSeverity::Moderate),
        ]);
        let check = evaluate("p1", &["A", "B", "C"], &[], &base);
        let severities: Vec<_> = check.interactions().iter().map(|r| r.severity).collect();
        // Pairs visited as (A,B), (A,C), (B,C).
        assert_eq!(
            severities,
            vec![
                InteractionSeverity::Moderate,
                InteractionSeverity::Major,
                InteractionSeverity::Minor
            ]
        );
    }

    #[test]
    fn one_drug_can_match_several_allergies() {
        let allergies = vec![
            AllergyRecord::new("Penicillin", "Hives", AllergySeverity::Moderate),
            AllergyRecord::new("cillin", "Rash", AllergySeverity::Mild),
        ];
        let check = evaluate("p1", &["Penicillin G", "Ibuprofen"], &allergies, &test_base());
        assert_eq!(check.warnings().len(), 2);
        assert_eq!(check.warnings()[0].allergen, "Penicillin");
        assert_eq!(check.warnings()[1].allergen, "cillin");
    }

    #[test]
    fn interactions_and_warnings_together() {
        let allergies = vec![AllergyRecord::new("Aspirin", "Bronchospasm", AllergySeverity::Severe)];
        let check = evaluate("p1", &["Warfarin", "Aspirin"], &allergies, &test_base());
        assert_eq!(check.interactions().len(), 1);
        assert_eq!(check.warnings().len(), 1);
        assert_eq!(check.finding_count(), 2);
    }

    #[test]
    fn repeated_evaluation_is_deterministic() {
        let base = test_base();
        let allergies = penicillin_allergy();
        let drugs = ["Warfarin", "Aspirin", "Penicillin V"];
        let first = evaluate("p1", &drugs, &allergies, &base);
        let second = evaluate("p1", &drugs, &allergies, &base);
        assert_eq!(first.interactions(), second.interactions());
        assert_eq!(first.warnings(), second.warnings());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn check_records_evaluated_list_and_patient() {
        let check = evaluate("patient-42", &["Warfarin"], &[], &test_base());
        assert_eq!(check.patient_id(), "patient-42");
        assert_eq!(check.medications(), &["Warfarin".to_string()]);
    }
}
