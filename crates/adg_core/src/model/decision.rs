//! Decision domain model.
//!
//! # Responsibility
//! - Define the metadata record shared by frontmatter and index entries.
//! - Own the flattening of link relations at the YAML boundary.
//!
//! # Invariants
//! - `precedes` and `succeeds` never appear as keys of `Links::custom`.
//! - `comments[i].sequence == i + 1` for decisions mutated through the service.
//! - Field order of `Decision` is the on-disk key order.

use crate::model::section::Section;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Relation tag for the ordering edge `source -> target`.
pub const PRECEDES: &str = "precedes";
/// Inverse relation tag of [`PRECEDES`].
pub const SUCCEEDS: &str = "succeeds";

/// 4-digit zero-padded numeric identifier, unique within one model.
///
/// Kept as a type alias so on-disk strings pass through unchanged.
pub type DecisionId = String;

/// Formats a numeric id as a zero-padded `DecisionId`.
pub fn format_decision_id(number: u32) -> DecisionId {
    format!("{number:04}")
}

/// Parses a `DecisionId`-like string into its number.
///
/// Returns `None` for empty or non-digit input.
pub fn parse_decision_id(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Decision lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    /// Still being discussed; outcome not written yet.
    #[default]
    Open,
    /// Outcome recorded. Changing it requires a revision.
    Decided,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Decided => "decided",
        }
    }
}

impl Display for DecisionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relations of one decision to others in the same model.
///
/// Serialized flat: `precedes`, `succeeds` and every custom tag are sibling
/// keys of the `links` mapping, written in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    /// Decisions this one must happen before.
    pub precedes: Vec<DecisionId>,
    /// Decisions this one must happen after.
    pub succeeds: Vec<DecisionId>,
    /// Free-form relation tag -> target ids.
    pub custom: BTreeMap<String, Vec<DecisionId>>,
}

impl Links {
    /// Returns true when no relation of any kind is recorded.
    pub fn is_empty(&self) -> bool {
        self.precedes.is_empty()
            && self.succeeds.is_empty()
            && self.custom.values().all(Vec::is_empty)
    }
}

impl Serialize for Links {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: BTreeMap<&str, &Vec<DecisionId>> = self
            .custom
            .iter()
            .map(|(tag, targets)| (tag.as_str(), targets))
            .collect();
        entries.insert(PRECEDES, &self.precedes);
        entries.insert(SUCCEEDS, &self.succeeds);

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (tag, targets) in entries {
            map.serialize_entry(tag, targets)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Links {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, Option<Vec<Scalar>>>>::deserialize(deserializer)?
            .unwrap_or_default();

        let mut links = Links::default();
        for (tag, targets) in raw {
            let targets: Vec<DecisionId> = targets
                .unwrap_or_default()
                .into_iter()
                .map(Scalar::into_string)
                .collect();
            match tag.as_str() {
                PRECEDES => links.precedes = targets,
                SUCCEEDS => links.succeeds = targets,
                _ => {
                    links.custom.insert(tag, targets);
                }
            }
        }
        Ok(links)
    }
}

/// One recorded comment; the prose itself lives in the comments section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "date")]
    pub timestamp: String,
    /// 1-based position, matching the `comment-N` anchor in the body.
    #[serde(rename = "comment", with = "sequence_text")]
    pub sequence: u32,
}

/// Canonical metadata record of one decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Serialized as `adr_id` to match the document format.
    #[serde(rename = "adr_id", default, deserialize_with = "null_as_default")]
    pub id: DecisionId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: DecisionStatus,
    /// Display order is insertion order; matching ignores order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Links,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

impl Decision {
    /// Creates an open decision without id, tags, links or comments.
    ///
    /// The id is assigned by the repository on create.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn is_decided(&self) -> bool {
        self.status == DecisionStatus::Decided
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }
}

/// Section bodies of one decision, each without its own heading line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionContent {
    pub question: String,
    pub options: String,
    pub criteria: String,
    pub outcome: String,
    pub comments: String,
}

impl DecisionContent {
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::Question => &self.question,
            Section::Options => &self.options,
            Section::Criteria => &self.criteria,
            Section::Outcome => &self.outcome,
            Section::Comments => &self.comments,
        }
    }

    pub fn set(&mut self, section: Section, body: impl Into<String>) {
        let body = body.into();
        match section {
            Section::Question => self.question = body,
            Section::Options => self.options = body,
            Section::Criteria => self.criteria = body,
            Section::Outcome => self.outcome = body,
            Section::Comments => self.comments = body,
        }
    }
}

/// YAML scalar accepted inside link lists and comment numbers.
///
/// Hand-edited files may carry unquoted ids, which YAML reads as integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Comment numbers are stored as strings (`comment: '3'`).
mod sequence_text {
    use super::Scalar;
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = Scalar::deserialize(deserializer)?.into_string();
        raw.trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid comment number `{raw}`")))
    }
}
