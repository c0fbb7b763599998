//! Section editor: anchor-addressed rewrite of one body section.
//!
//! # Responsibility
//! - Parse a body once into heading blocks, edit structurally, render once.
//! - Replace an existing section or insert a missing one in canonical order.
//!
//! # Invariants
//! - `SectionedBody::parse(body).render() == body` for every input.
//! - Edits touch exactly one block; all other blocks keep their bytes.
//! - A replaced block is `heading + content + one blank line`.

use crate::document::anchor::{anchored_section, section_heading, HEADING_PREFIX};
use crate::model::section::Section;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    /// Section whose anchor is in the heading; `None` for free headings.
    section: Option<Section>,
    heading: String,
    lines: Vec<String>,
}

/// Body of a decision document as ordered heading blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionedBody {
    /// Lines before the first heading.
    preamble: Vec<String>,
    blocks: Vec<Block>,
}

impl SectionedBody {
    /// Splits a body into preamble and `## ` blocks.
    pub fn parse(body: &str) -> Self {
        let mut preamble = Vec::new();
        let mut blocks: Vec<Block> = Vec::new();

        for line in body.split('\n') {
            if line.starts_with(HEADING_PREFIX) {
                blocks.push(Block {
                    section: anchored_section(line),
                    heading: line.to_string(),
                    lines: Vec::new(),
                });
            } else if let Some(block) = blocks.last_mut() {
                block.lines.push(line.to_string());
            } else {
                preamble.push(line.to_string());
            }
        }

        Self { preamble, blocks }
    }

    /// Whether a heading with this section's anchor exists.
    pub fn has_section(&self, section: Section) -> bool {
        self.position(section).is_some()
    }

    /// Lines below the anchored heading, blank separators included.
    pub fn section_lines(&self, section: Section) -> Option<&[String]> {
        self.position(section)
            .map(|index| self.blocks[index].lines.as_slice())
    }

    /// Replaces the body of `section` with `content`.
    ///
    /// When the anchor is absent, a block headed by `label` is inserted before
    /// the first existing later section, or appended at the end.
    pub fn replace_section(&mut self, section: Section, label: &str, content: &[String]) {
        let mut lines = content.to_vec();
        lines.push(String::new());

        match self.position(section) {
            Some(index) => self.blocks[index].lines = lines,
            None => self.insert_block(section, label, lines),
        }
    }

    /// Appends `content` after the existing body of `section`.
    ///
    /// Trailing blank lines of the old body are collapsed into the single
    /// separator written after the new lines.
    pub fn append_to_section(&mut self, section: Section, label: &str, content: &[String]) {
        let Some(index) = self.position(section) else {
            self.replace_section(section, label, content);
            return;
        };

        let block = &mut self.blocks[index];
        while block.lines.last().is_some_and(|line| line.trim().is_empty()) {
            block.lines.pop();
        }
        block.lines.extend(content.iter().cloned());
        block.lines.push(String::new());
    }

    /// Renders back to body text.
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = self.preamble.iter().map(String::as_str).collect();
        for block in &self.blocks {
            lines.push(&block.heading);
            lines.extend(block.lines.iter().map(String::as_str));
        }
        lines.join("\n")
    }

    fn position(&self, section: Section) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.section == Some(section))
    }

    fn insert_block(&mut self, section: Section, label: &str, lines: Vec<String>) {
        let block = Block {
            section: Some(section),
            heading: section_heading(section, label),
            lines,
        };
        let later = self
            .blocks
            .iter()
            .position(|existing| existing.section.is_some_and(|other| other > section));
        match later {
            Some(index) => self.blocks.insert(index, block),
            None => self.blocks.push(block),
        }
    }
}

/// Splits multi-line text into editor lines.
pub fn text_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::codec::extract_sections;
    use proptest::prelude::*;

    const BODY: &str = "\n## <a name=\"question\"></a> Question\nWhich broker?\n\n## <a name=\"options\"></a> Options\n1. <a name=\"option-1\"></a> Kafka\n\n## <a name=\"criteria\"></a> Criteria\n- latency\n\n";

    #[test]
    fn parse_render_is_identity() {
        for body in [BODY, "", "\n", "plain text\nno headings", "## Notes\nx\n"] {
            assert_eq!(SectionedBody::parse(body).render(), body);
        }
    }

    #[test]
    fn replace_existing_section_keeps_heading() {
        let mut doc = SectionedBody::parse(BODY);
        doc.replace_section(Section::Options, "Ignored", &text_lines("1. new\n2. newer"));
        let rendered = doc.render();
        assert!(rendered.contains("## <a name=\"options\"></a> Options\n1. new\n2. newer\n\n## <a name=\"criteria\"></a>"));
        assert!(!rendered.contains("Ignored"));
        assert!(!rendered.contains("Kafka"));
    }

    #[test]
    fn missing_section_is_inserted_before_later_sections() {
        let body = "\n## <a name=\"question\"></a> Question\nQ\n\n## <a name=\"comments\"></a> Comments\nc1\n\n";
        let mut doc = SectionedBody::parse(body);
        doc.replace_section(Section::Outcome, "Outcome", &text_lines("done"));
        let rendered = doc.render();
        let outcome_at = rendered.find("name=\"outcome\"").unwrap();
        let comments_at = rendered.find("name=\"comments\"").unwrap();
        assert!(outcome_at < comments_at);
        assert!(rendered.contains("## <a name=\"outcome\"></a> Outcome\ndone\n\n## <a name=\"comments\"></a>"));
    }

    #[test]
    fn missing_last_section_is_appended() {
        let mut doc = SectionedBody::parse(BODY);
        doc.replace_section(Section::Outcome, "Result", &text_lines("done"));
        assert!(doc
            .render()
            .ends_with("- latency\n\n\n## <a name=\"outcome\"></a> Result\ndone\n"));
    }

    #[test]
    fn append_grows_existing_section() {
        let mut doc = SectionedBody::parse(BODY);
        doc.append_to_section(Section::Question, "Question", &text_lines("More context."));
        let lines = doc.section_lines(Section::Question).unwrap();
        assert_eq!(lines, ["Which broker?", "More context.", ""]);
    }

    fn section_strategy() -> impl Strategy<Value = Section> {
        prop::sample::select(Section::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn editing_one_section_leaves_others_byte_identical(
            present in prop::collection::vec(any::<bool>(), 5),
            target in section_strategy(),
            content in prop::collection::vec("[a-zA-Z0-9 .,-]{0,24}", 0..4),
        ) {
            let mut body = String::from("\n");
            for (section, keep) in Section::ALL.into_iter().zip(present) {
                if keep {
                    body.push_str(&section_heading(section, section.name()));
                    body.push_str(&format!("\nbody of {section}\nsecond line\n\n"));
                }
            }
            let before = extract_sections(&body);

            let mut doc = SectionedBody::parse(&body);
            doc.replace_section(target, "Label", &content);
            let after = extract_sections(&doc.render());

            for section in Section::ALL.into_iter().filter(|s| *s != target) {
                prop_assert_eq!(before.get(&section), after.get(&section));
            }
            prop_assert!(after.contains_key(&target));
        }
    }
}
