//! Fixed section template of a decision document.

use std::fmt::{Display, Formatter};

/// One of the five structurally understood body sections.
///
/// Variant order is the canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Question,
    Options,
    Criteria,
    Outcome,
    Comments,
}

impl Section {
    /// All sections in canonical document order.
    pub const ALL: [Section; 5] = [
        Section::Question,
        Section::Options,
        Section::Criteria,
        Section::Outcome,
        Section::Comments,
    ];

    /// Sections every valid document must carry an anchor for.
    pub const REQUIRED: [Section; 3] = [Section::Question, Section::Options, Section::Criteria];

    /// Anchor name, also used as the section keyword.
    pub fn name(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Options => "options",
            Self::Criteria => "criteria",
            Self::Outcome => "outcome",
            Self::Comments => "comments",
        }
    }

    /// Parses an anchor name such as `criteria`.
    pub fn from_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.name() == value)
    }

    /// Whether `compose` always emits this section, even when empty.
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Keyword looked up in heading lines when no anchor is present.
    ///
    /// `comment` (singular) so both "Comment" and "Comments" labels match.
    pub(crate) fn heading_keyword(self) -> &'static str {
        match self {
            Self::Comments => "comment",
            other => other.name(),
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
