// Log hygiene for the safety engine. A check carries the clinician's working
// medication list, the patient's allergens and reactions, and the free-text
// override justification. None of that may reach a log line; tracing calls
// carry check ids, encounter keys, finding counts, severities and timings.
// The access log is covered as well: it logs the path without the query
// string, since `/api/interactions` takes drug names as query parameters.
//
// This module scans every tracing call under src/ for field names and
// interpolations that would carry such data.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    /// Field names and interpolations that would leak patient data if they
    /// appeared inside a tracing macro.
    const PHI_PATTERNS: &[&str] = &[
        // Medication list and interaction rule contents
        "drug_a",
        "drug_b",
        "drug_name",
        ".drug1",
        ".drug2",
        "medications",
        "description",
        "mechanism",
        "clinical_effect",
        "management",
        // Allergy contents
        "allergen",
        "reaction",
        // Override justification
        "reason",
        "override_reason",
        // Whole records through Debug
        "{check:?}",
        "{rule:?}",
        "{warning:?}",
        "{allergy:?}",
        "{record:?}",
        "{request:?}",
        "uri()",
    ];

    const TRACING_MACROS: &[&str] = &[
        "tracing::trace!",
        "tracing::debug!",
        "tracing::info!",
        "tracing::warn!",
        "tracing::error!",
    ];

    /// This file lists the patterns on purpose.
    const SKIPPED_FILES: &[&str] = &["phi_audit.rs"];

    struct Violation {
        file: String,
        line: usize,
        pattern: &'static str,
        call: String,
    }

    /// Every tracing call in `source` as (1-based start line, call text joined
    /// onto one line). A call ends where its parentheses balance.
    fn tracing_calls(source: &str) -> Vec<(usize, String)> {
        let lines: Vec<&str> = source.lines().collect();
        let mut calls = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let first = lines[i].trim();
            if !TRACING_MACROS.iter().any(|m| first.starts_with(m)) {
                i += 1;
                continue;
            }

            let start = i + 1;
            let mut call = first.to_string();
            let mut depth = paren_balance(first);
            i += 1;
            while depth > 0 && i < lines.len() {
                let next = lines[i].trim();
                call.push(' ');
                call.push_str(next);
                depth += paren_balance(next);
                i += 1;
            }
            calls.push((start, call));
        }
        calls
    }

    fn paren_balance(text: &str) -> i32 {
        text.chars().fold(0, |depth, ch| match ch {
            '(' => depth + 1,
            ')' => depth - 1,
            _ => depth,
        })
    }

    fn violations_in(file: &str, source: &str) -> Vec<Violation> {
        tracing_calls(source)
            .into_iter()
            .flat_map(|(line, call)| {
                PHI_PATTERNS
                    .iter()
                    .copied()
                    .filter(|p| call.contains(p))
                    .map(|pattern| Violation {
                        file: file.to_string(),
                        line,
                        pattern,
                        call: call.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn scan(dir: &Path, root: &Path, found: &mut Vec<Violation>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                scan(&path, root, found);
                continue;
            }
            let skipped = path
                .file_name()
                .is_some_and(|name| SKIPPED_FILES.iter().any(|s| name == *s));
            if skipped || path.extension().map_or(true, |ext| ext != "rs") {
                continue;
            }
            if let Ok(source) = fs::read_to_string(&path) {
                let file = path.strip_prefix(root).unwrap_or(&path).display().to_string();
                found.extend(violations_in(&file, &source));
            }
        }
    }

    #[test]
    fn no_patient_data_in_tracing_calls() {
        let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        assert!(src.exists(), "Source directory not found: {}", src.display());

        let mut found = Vec::new();
        scan(&src, &src, &mut found);

        let report: Vec<String> = found
            .iter()
            .map(|v| format!("  {}:{}: '{}' in: {}", v.file, v.line, v.pattern, v.call))
            .collect();
        assert!(
            report.is_empty(),
            "{} tracing call(s) carry patient data:\n{}\n\nLog check ids and counts instead.",
            report.len(),
            report.join("\n")
        );
    }

    #[test]
    fn multi_line_call_is_joined() {
        let source = "fn f() {\n    tracing::warn!(\n        dropped = 2,\n        allergen = %a,\n        \"x\"\n    );\n    let y = 1;\n}\n";
        let calls = tracing_calls(source);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 2);
        assert!(calls[0].1.ends_with(");"));

        let found = violations_in("synthetic.rs", source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern, "allergen");
    }

    #[test]
    fn override_reason_in_log_is_caught() {
        let source = r#"tracing::info!(check_id = %id, reason = %record.reason, "overridden");"#;
        let patterns: Vec<_> = violations_in("synthetic.rs", source)
            .into_iter()
            .map(|v| v.pattern)
            .collect();
        assert!(patterns.contains(&"reason"));
    }

    #[test]
    fn ids_and_counts_pass() {
        let source = r#"tracing::info!(check_id = %check.id(), findings = 2, highest = "major", "check evaluated");"#;
        assert!(violations_in("synthetic.rs", source).is_empty());
    }

    #[test]
    fn non_tracing_lines_are_ignored() {
        let source = r#"let reason = request.reason.trim();"#;
        assert!(tracing_calls(source).is_empty());
    }
}
