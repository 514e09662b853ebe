use std::collections::HashMap;
use std::path::Path;

use crate::models::InteractionRule;

use super::types::SafetyError;

/// Bundled rule set, used when no external rule file is configured.
const BUNDLED_RULES: &str = include_str!("../../resources/interactions.json");

/// Pairwise drug-interaction rules, immutable once built.
///
/// Drug names match exactly and case-sensitively. The pair is unordered:
/// ("Warfarin", "Aspirin") and ("Aspirin", "Warfarin") find the same rule.
pub struct InteractionKnowledgeBase {
    rules: Vec<InteractionRule>,
    index: HashMap<(String, String), usize>,
    duplicates_skipped: usize,
}

/// Order-independent index key.
fn pair_key(drug_a: &str, drug_b: &str) -> (String, String) {
    if drug_a <= drug_b {
        (drug_a.to_string(), drug_b.to_string())
    } else {
        (drug_b.to_string(), drug_a.to_string())
    }
}

impl InteractionKnowledgeBase {
    /// Build from a rule list. When two rules name the same pair the first wins.
    pub fn from_rules(rules: Vec<InteractionRule>) -> Self {
        let mut kept = Vec::with_capacity(rules.len());
        let mut index = HashMap::with_capacity(rules.len());
        let mut duplicates_skipped = 0;

        for rule in rules {
            let key = pair_key(&rule.drug1, &rule.drug2);
            if index.contains_key(&key) {
                duplicates_skipped += 1;
                continue;
            }
            index.insert(key, kept.len());
            kept.push(rule);
        }

        if duplicates_skipped > 0 {
            tracing::warn!(
                duplicates_skipped,
                "Interaction rule set contains duplicate pairs, first rule kept"
            );
        }

        Self {
            rules: kept,
            index,
            duplicates_skipped,
        }
    }

    /// An empty base: every lookup is a miss.
    pub fn empty() -> Self {
        Self::from_rules(Vec::new())
    }

    /// Parse a JSON array of rules. `source` names the input in errors.
    pub fn from_json(source: &str, json: &str) -> Result<Self, SafetyError> {
        let rules: Vec<InteractionRule> = serde_json::from_str(json)
            .map_err(|e| SafetyError::KnowledgeBaseParse(source.into(), e.to_string()))?;
        Ok(Self::from_rules(rules))
    }

    /// Load a JSON rule file.
    pub fn load(path: &Path) -> Result<Self, SafetyError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SafetyError::KnowledgeBaseLoad(path.display().to_string(), e.to_string())
        })?;
        let base = Self::from_json(&path.display().to_string(), &json)?;
        tracing::info!(rules = base.len(), "Loaded interaction knowledge base from file");
        Ok(base)
    }

    /// The rule set shipped with the crate.
    pub fn bundled() -> Result<Self, SafetyError> {
        Self::from_json("bundled interactions.json", BUNDLED_RULES)
    }

    /// Look up the rule for a pair, in either order.
    pub fn find_interaction(&self, drug_a: &str, drug_b: &str) -> Option<&InteractionRule> {
        self.index
            .get(&pair_key(drug_a, drug_b))
            .and_then(|&i| self.rules.get(i))
            .filter(|rule| rule.covers(drug_a, drug_b))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;
    use crate::models::enums::InteractionSeverity;

    pub(crate) fn rule(a: &str, b: &str, severity: InteractionSeverity) -> InteractionRule {
        InteractionRule {
            drug1: a.into(),
            drug2: b.into(),
            severity,
            description: format!("{a} interacts with {b}"),
            mechanism: "test mechanism".into(),
            clinical_effect: "test effect".into(),
            management: "test management".into(),
        }
    }

    /// Small fixed base shared by the engine tests.
    pub(crate) fn test_base() -> InteractionKnowledgeBase {
        InteractionKnowledgeBase::from_rules(vec![
            rule("Warfarin", "Aspirin", InteractionSeverity::Major),
            rule("Simvastatin", "Clarithromycin", InteractionSeverity::Contraindicated),
            rule("Lisinopril", "Spironolactone", InteractionSeverity::Moderate),
            rule("Levothyroxine", "Calcium Carbonate", InteractionSeverity::Minor),
        ])
    }

    #[test]
    fn lookup_is_symmetric() {
        let base = test_base();
        let forward = base.find_interaction("Warfarin", "Aspirin").unwrap();
        let reverse = base.find_interaction("Aspirin", "Warfarin").unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward.severity, InteractionSeverity::Major);
    }

    #[test]
    fn lookup_preserves_authored_order() {
        let base = test_base();
        let found = base.find_interaction("Aspirin", "Warfarin").unwrap();
        assert_eq!(found.drug1, "Warfarin");
        assert_eq!(found.drug2, "Aspirin");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let base = test_base();
        assert!(base.find_interaction("warfarin", "aspirin").is_none());
        assert!(base.find_interaction("WARFARIN", "Aspirin").is_none());
    }

    #[test]
    fn unknown_drugs_miss() {
        let base = test_base();
        assert!(base.find_interaction("Acetaminophen", "Warfarin").is_none());
        assert!(base.find_interaction("Warfarin", "Warfarin").is_none());
    }

    #[test]
    fn duplicate_pairs_keep_first() {
        let base = InteractionKnowledgeBase::from_rules(vec![
            rule("Warfarin", "Aspirin", InteractionSeverity::Major),
            rule("Aspirin", "Warfarin", InteractionSeverity::Minor),
        ]);
        assert_eq!(base.len(), 1);
        assert_eq!(base.duplicates_skipped(), 1);
        assert_eq!(
            base.find_interaction("Warfarin", "Aspirin").unwrap().severity,
            InteractionSeverity::Major
        );
    }

    #[test]
    fn bundled_rules_parse() {
        let base = InteractionKnowledgeBase::bundled().unwrap();
        assert!(base.len() >= 10);
        assert_eq!(base.duplicates_skipped(), 0);
        let rule = base.find_interaction("Aspirin", "Warfarin").unwrap();
        assert_eq!(rule.severity, InteractionSeverity::Major);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&vec![rule(
            "Sertraline",
            "Tramadol",
            InteractionSeverity::Major,
        )])
        .unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let base = InteractionKnowledgeBase::load(file.path()).unwrap();
        assert_eq!(base.len(), 1);
        assert!(base.find_interaction("Tramadol", "Sertraline").is_some());
    }

    #[test]
    fn load_missing_file_fails() {
        let result = InteractionKnowledgeBase::load(Path::new("/nonexistent/rules.json"));
        assert!(matches!(result, Err(SafetyError::KnowledgeBaseLoad(_, _))));
    }

    #[test]
    fn malformed_json_fails_with_parse_error() {
        let result = InteractionKnowledgeBase::from_json("inline", "[{\"drug1\": \"A\"}]");
        assert!(matches!(result, Err(SafetyError::KnowledgeBaseParse(_, _))));
    }

    #[test]
    fn unknown_severity_is_rejected_at_load() {
        let json = r#"[{"drug1":"A","drug2":"B","severity":"severe-ish","description":"",
            "mechanism":"","clinical_effect":"","management":""}]"#;
        assert!(InteractionKnowledgeBase::from_json("inline", json).is_err());
    }
}
