//! Clinician-facing finding text.
//! Plain statements of what was found and what the rule advises. No wording
//! here changes gating; every finding blocks regardless of how it reads.

use crate::models::InteractionRule;

use super::types::{AllergyWarning, SafetyCheck};

/// Interaction one-liner, e.g.
/// "MAJOR interaction: Warfarin + Aspirin. Increased bleeding risk. Management: Monitor INR closely."
pub fn interaction(rule: &InteractionRule) -> String {
    let mut message = format!(
        "{} interaction: {} + {}.",
        rule.severity.as_str().to_uppercase(),
        rule.drug1,
        rule.drug2,
    );
    push_sentence(&mut message, &rule.description);
    if !rule.management.trim().is_empty() {
        message.push_str(" Management: ");
        message.push_str(rule.management.trim());
        ensure_period(&mut message);
    }
    message
}

/// Allergy one-liner.
pub fn allergy(warning: &AllergyWarning) -> String {
    let mut message = format!(
        "{} allergy: {} matches recorded allergen {}.",
        warning.severity.as_str().to_uppercase(),
        warning.drug,
        warning.allergen,
    );
    if !warning.reaction.trim().is_empty() {
        message.push_str(" Recorded reaction: ");
        message.push_str(warning.reaction.trim());
        ensure_period(&mut message);
    }
    message
}

/// Every finding of a check in evaluation order: interactions first, then
/// allergy warnings. Empty for a clean check.
pub fn summary(check: &SafetyCheck) -> Vec<String> {
    check
        .interactions()
        .iter()
        .map(interaction)
        .chain(check.warnings().iter().map(allergy))
        .collect()
}

fn push_sentence(message: &mut String, sentence: &str) {
    let sentence = sentence.trim();
    if sentence.is_empty() {
        return;
    }
    message.push(' ');
    message.push_str(sentence);
    ensure_period(message);
}

fn ensure_period(message: &mut String) {
    if !message.ends_with(['.', '!', '?']) {
        message.push('.');
    }
}
