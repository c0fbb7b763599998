//! Document codec: file text <-> `(Decision, DecisionContent)`.
//!
//! # Invariants
//! - `parse(compose(d, c))` yields `d` exactly and `c` with trimmed bodies.
//! - `merge_metadata` keeps unknown frontmatter keys and their positions.
//! - CRLF line endings are normalized to LF before splitting.

use crate::config::DocumentConfig;
use crate::document::anchor::{anchored_section, section_heading, HEADING_PREFIX};
use crate::document::DocumentError;
use crate::model::decision::{Decision, DecisionContent};
use crate::model::section::Section;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

const DELIMITER: &str = "---\n";

/// Raw frontmatter/body split of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// YAML text between the delimiters, ending with a newline when non-empty.
    pub metadata: String,
    /// Everything after the closing delimiter.
    pub body: String,
}

/// Splits document text at the first two `---` delimiters.
///
/// # Errors
/// - `MissingFrontmatter` when fewer than two delimiters are present.
pub fn split(text: &str) -> Result<RawDocument, DocumentError> {
    let normalized = text.replace("\r\n", "\n");
    let mut parts = normalized.splitn(3, DELIMITER);
    let _leading = parts.next();
    let metadata = parts.next().ok_or(DocumentError::MissingFrontmatter)?;
    let body = parts.next();

    // A closing delimiter at EOF has no trailing newline to split on.
    let metadata = match body {
        Some(_) => metadata,
        None => metadata
            .strip_suffix("---")
            .ok_or(DocumentError::MissingFrontmatter)?,
    };

    Ok(RawDocument {
        metadata: metadata.to_string(),
        body: body.unwrap_or_default().to_string(),
    })
}

/// Parses full document text into metadata and raw body.
pub fn parse(text: &str) -> Result<(Decision, String), DocumentError> {
    let raw = split(text)?;
    let decision = decode_metadata(&raw.metadata)?;
    Ok((decision, raw.body))
}

/// Decodes a frontmatter block; an empty block is an empty decision.
pub fn decode_metadata(metadata: &str) -> Result<Decision, DocumentError> {
    if metadata.trim().is_empty() {
        return Ok(Decision::default());
    }
    serde_yaml::from_str(metadata).map_err(DocumentError::InvalidMetadata)
}

/// Encodes metadata as a YAML block ending with a newline.
pub fn encode_metadata(decision: &Decision) -> Result<String, DocumentError> {
    let mut yaml = serde_yaml::to_string(decision).map_err(DocumentError::Encode)?;
    if !yaml.ends_with('\n') {
        yaml.push('\n');
    }
    Ok(yaml)
}

/// Overlays `decision` onto an existing frontmatter block.
///
/// Keys the record does not know about are kept in place.
pub fn merge_metadata(existing: &str, decision: &Decision) -> Result<String, DocumentError> {
    let mut merged = if existing.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(existing).map_err(DocumentError::InvalidMetadata)? {
            Value::Mapping(mapping) => mapping,
            _ => Mapping::new(),
        }
    };

    if let Value::Mapping(fields) = serde_yaml::to_value(decision).map_err(DocumentError::Encode)?
    {
        for (key, value) in fields {
            merged.insert(key, value);
        }
    }

    let mut yaml = serde_yaml::to_string(&merged).map_err(DocumentError::Encode)?;
    if !yaml.ends_with('\n') {
        yaml.push('\n');
    }
    Ok(yaml)
}

/// Joins a frontmatter block and a body into document text.
pub fn assemble(metadata: &str, body: &str) -> String {
    let mut out = String::with_capacity(metadata.len() + body.len() + 9);
    out.push_str(DELIMITER);
    out.push_str(metadata);
    if !metadata.is_empty() && !metadata.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    if !body.starts_with('\n') {
        out.push('\n');
    }
    out.push_str(body);
    out
}

/// Composes a new document from metadata and section bodies.
///
/// Question, options and criteria are always written; outcome and comments
/// only when non-blank.
pub fn compose(
    decision: &Decision,
    content: &DecisionContent,
    config: &DocumentConfig,
) -> Result<String, DocumentError> {
    let mut out = String::from(DELIMITER);
    out.push_str(&encode_metadata(decision)?);
    out.push_str(DELIMITER);
    out.push('\n');

    for section in Section::ALL {
        let body = content.get(section);
        if !section.is_required() && body.trim().is_empty() {
            continue;
        }
        out.push_str(&section_heading(section, config.header_for(section)));
        out.push('\n');
        out.push_str(body);
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Classifies a `## ` heading line.
///
/// The anchor wins; otherwise the first section keyword found in the
/// lowercased line. Other headings return `None`.
pub fn heading_section(line: &str) -> Option<Section> {
    if !line.starts_with(HEADING_PREFIX) {
        return None;
    }
    if let Some(section) = anchored_section(line) {
        return Some(section);
    }
    let lowered = line.to_lowercase();
    Section::ALL
        .into_iter()
        .find(|section| lowered.contains(section.heading_keyword()))
}

/// Splits a body into raw section blocks, heading line included.
///
/// Lines under unrecognized headings belong to no section.
pub fn extract_sections(body: &str) -> BTreeMap<Section, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<Section> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in body.split('\n') {
        if line.starts_with(HEADING_PREFIX) {
            if let Some(section) = current.take() {
                sections.insert(section, buffer.join("\n"));
            }
            current = heading_section(line);
            buffer = vec![line];
        } else if current.is_some() {
            buffer.push(line);
        }
    }
    if let Some(section) = current {
        sections.insert(section, buffer.join("\n"));
    }
    sections
}

/// Drops the heading line of a raw block and trims surrounding blank lines.
pub fn strip_header(block: &str) -> String {
    match block.split_once('\n') {
        Some((_, rest)) => rest.trim().to_string(),
        None => String::new(),
    }
}

/// Decodes the five section bodies of a document body.
pub fn decode_content(body: &str) -> DecisionContent {
    let sections = extract_sections(body);
    let mut content = DecisionContent::default();
    for (section, block) in sections {
        content.set(section, strip_header(&block));
    }
    content
}
