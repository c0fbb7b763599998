//! Anchor markers and the lines built from them.

use crate::model::section::Section;

/// Prefix of every section heading line.
pub const HEADING_PREFIX: &str = "## ";

/// `<a name="criteria"></a>`
pub fn section_anchor(section: Section) -> String {
    format!(r#"<a name="{}"></a>"#, section.name())
}

/// Full heading line of a section block.
pub fn section_heading(section: Section, label: &str) -> String {
    format!("{HEADING_PREFIX}{} {label}", section_anchor(section))
}

/// `<a name="option-2"></a>`
pub fn option_anchor(number: u32) -> String {
    format!(r#"<a name="option-{number}"></a>"#)
}

/// Markdown link pointing at an option anchor.
pub fn option_link(number: u32) -> String {
    format!("[Option {number}](#option-{number})")
}

/// `3. <a name="option-3"></a> Use Kafka`
pub fn option_line(number: u32, label: &str) -> String {
    format!("{number}. {} {label}", option_anchor(number))
}

/// `<a name="comment-1"></a>1. (2024-05-01 10:00:00) alice: text`
pub fn comment_line(number: u32, author: &str, timestamp: &str, text: &str) -> String {
    format!(r#"<a name="comment-{number}"></a>{number}. ({timestamp}) {author}: {text}"#)
}

/// Outcome sentence written by the decide operation.
pub fn outcome_text(option_number: u32, rationale: &str) -> String {
    let link = option_link(option_number);
    if rationale.trim().is_empty() {
        format!("We decided for {link}.")
    } else {
        format!("We decided for {link} because: {rationale}")
    }
}

/// Section whose anchor appears in `line`, if any.
pub(crate) fn anchored_section(line: &str) -> Option<Section> {
    Section::ALL
        .into_iter()
        .find(|section| line.contains(&section_anchor(*section)))
}
