//! Decision id allocation and cross-model renumbering.
//!
//! # Invariants
//! - Allocation is directory-scan based; gaps are tolerated, ids never reused
//!   while the highest file is still present.
//! - Shifting rewrites relative link references only, never the own id.
//! - Non-numeric link entries pass through unchanged.

use crate::model::decision::{format_decision_id, parse_decision_id, Decision, DecisionId};
use crate::repo::{walk_error, RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Largest id that fits the 4-digit file name pattern.
pub const MAX_DECISION_ID: u32 = 9999;

static DECISION_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^AD(\d{4})-.*\.md$").expect("valid decision file regex"));

/// Whether `name` follows `AD####-<slug>.md`.
pub fn is_decision_filename(name: &str) -> bool {
    DECISION_FILE_RE.is_match(name)
}

/// Numeric id encoded in a decision file name.
pub fn id_from_filename(name: &str) -> Option<u32> {
    DECISION_FILE_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Highest id among decision files below `model`; `0` when none exist.
pub fn highest_file_id(model: &Path) -> RepoResult<u32> {
    if !model.exists() {
        return Ok(0);
    }

    let mut highest = 0;
    for entry in WalkDir::new(model) {
        let entry = entry.map_err(|err| walk_error(model, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(id) = entry.file_name().to_str().and_then(id_from_filename) {
            highest = highest.max(id);
        }
    }
    Ok(highest)
}

/// Next free id of `model`: highest file id plus one, zero padded.
///
/// # Errors
/// - `IdSpaceExhausted` once `AD9999` exists.
pub fn next_id(model: &Path) -> RepoResult<DecisionId> {
    let highest = highest_file_id(model)?;
    if highest >= MAX_DECISION_ID {
        return Err(RepoError::IdSpaceExhausted(highest));
    }
    Ok(format_decision_id(highest + 1))
}

/// Adds `delta` to a numeric id reference.
pub fn shift_id(id: &str, delta: u32) -> DecisionId {
    match parse_decision_id(id) {
        Some(number) => format_decision_id(number.saturating_add(delta)),
        None => id.to_string(),
    }
}

/// Copy of `decision` with every link target shifted by `delta`.
pub fn shift_ids(decision: &Decision, delta: u32) -> Decision {
    let shift_all = |targets: &[DecisionId]| -> Vec<DecisionId> {
        targets.iter().map(|id| shift_id(id, delta)).collect()
    };

    let mut shifted = decision.clone();
    shifted.links.precedes = shift_all(&decision.links.precedes);
    shifted.links.succeeds = shift_all(&decision.links.succeeds);
    for targets in shifted.links.custom.values_mut() {
        *targets = shift_all(targets);
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filename_pattern_requires_four_digits_and_dash() {
        assert!(is_decision_filename("AD0001-use-kafka.md"));
        assert!(!is_decision_filename("AD001-short.md"));
        assert!(!is_decision_filename("AD0001.md"));
        assert!(!is_decision_filename("AD0001-x.txt"));
        assert_eq!(id_from_filename("AD0042-x.md"), Some(42));
    }

    #[test]
    fn next_id_tolerates_gaps_and_nesting() {
        let dir = TempDir::new().unwrap();
        assert_eq!(next_id(&dir.path().join("missing")).unwrap(), "0001");
        assert_eq!(next_id(dir.path()).unwrap(), "0001");

        std::fs::write(dir.path().join("AD0001-a.md"), "").unwrap();
        std::fs::create_dir(dir.path().join("infra")).unwrap();
        std::fs::write(dir.path().join("infra").join("AD0007-b.md"), "").unwrap();
        std::fs::write(dir.path().join("AD0099-notes.txt"), "").unwrap();

        assert_eq!(next_id(dir.path()).unwrap(), "0008");
    }

    #[test]
    fn next_id_stops_at_four_digits() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("AD9998-second-last.md"), "").unwrap();
        assert_eq!(next_id(dir.path()).unwrap(), "9999");

        std::fs::write(dir.path().join("AD9999-last.md"), "").unwrap();
        assert!(matches!(
            next_id(dir.path()).unwrap_err(),
            RepoError::IdSpaceExhausted(9999)
        ));
    }

    #[test]
    fn shift_rewrites_numeric_links_only() {
        let mut decision = Decision::new("Shifted");
        decision.id = "0001".to_string();
        decision.links.precedes = vec!["0001".to_string(), "external-rfc".to_string()];
        decision.links.succeeds = vec!["0002".to_string()];
        decision
            .links
            .custom
            .insert("relates".to_string(), vec!["0010".to_string()]);

        let shifted = shift_ids(&decision, 2);
        assert_eq!(shifted.id, "0001");
        assert_eq!(shifted.links.precedes, ["0003", "external-rfc"]);
        assert_eq!(shifted.links.succeeds, ["0004"]);
        assert_eq!(shifted.links.custom["relates"], ["0012"]);
    }
}
