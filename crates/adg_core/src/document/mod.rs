//! Hybrid markdown/YAML decision document format.
//!
//! # Responsibility
//! - Convert file text to `(Decision, body)` and back.
//! - Surgically rewrite one body section while preserving the others.
//! - Read and write the anchor-tagged option and comment lists.
//!
//! # Invariants
//! - Layout is `---\n<yaml>---\n<body>`; only the first two delimiters split.
//! - Sections are identified by `<a name="..."></a>` anchors in `## ` headings.
//! - Editing one section never changes the bytes of another.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod anchor;
pub mod codec;
pub mod editor;
pub mod options;

/// Errors raised while decoding or encoding a single document.
#[derive(Debug)]
pub enum DocumentError {
    /// Fewer than two `---` frontmatter delimiters.
    MissingFrontmatter,
    /// Frontmatter is not a valid decision mapping.
    InvalidMetadata(serde_yaml::Error),
    /// Metadata could not be rendered as YAML.
    Encode(serde_yaml::Error),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFrontmatter => write!(f, "missing frontmatter delimiters"),
            Self::InvalidMetadata(err) => write!(f, "invalid frontmatter: {err}"),
            Self::Encode(err) => write!(f, "failed to encode frontmatter: {err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingFrontmatter => None,
            Self::InvalidMetadata(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}
