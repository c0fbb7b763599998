//! Numbered, anchor-tagged option list inside the options section.
//!
//! # Invariants
//! - Option numbers are contiguous from 1 and never reused.
//! - Label lookup is case-insensitive and ignores surrounding whitespace.
//! - A purely numeric query is a position, never a label.

use crate::document::anchor::option_anchor;
use once_cell::sync::Lazy;
use regex::Regex;

static OPTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^.*<a name="option-(\d+)"></a>\s*(.+)$"#).expect("valid option line regex")
});

/// Returns the option number when `option` is a plain non-negative integer.
pub fn option_position(option: &str) -> Option<u32> {
    let trimmed = option.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Counts option anchors in an options body.
pub fn count_options<S: AsRef<str>>(lines: &[S]) -> u32 {
    let count = lines
        .iter()
        .filter(|line| line.as_ref().contains(r#"name="option-"#))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Resolves `option` (position or label) to its number within `content`.
pub fn find_option(content: &str, option: &str) -> Option<u32> {
    if let Some(number) = option_position(option) {
        return content
            .contains(&option_anchor(number))
            .then_some(number);
    }

    let target = option.trim().to_lowercase();
    content.split('\n').find_map(|line| {
        let caps = OPTION_LINE_RE.captures(line)?;
        let label = caps.get(2)?.as_str().trim().to_lowercase();
        if label != target {
            return None;
        }
        caps.get(1)?.as_str().parse().ok()
    })
}

/// Whether `option` names an existing option.
pub fn option_exists(content: &str, option: &str) -> bool {
    find_option(content, option).is_some()
}
