//! Relations between decisions.
//!
//! # Responsibility
//! - Classify a `(tag, reverse_tag)` pair as precedence or custom relation.
//! - Detect cycles in the `precedes` graph before an edge is added.
//! - Apply a relation symmetrically to both endpoints in memory.
//!
//! # Invariants
//! - `precedes`/`succeeds` are only ever written as a pair.
//! - Reserved tags never become custom tags.
//! - Custom relations are free-form and skip the cycle check.

use crate::model::decision::{Decision, DecisionId, PRECEDES, SUCCEEDS};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reverse tag used when a decision is superseded by a revision.
pub const REVISED_BY: &str = "revised by";
/// Reverse tag of [`REVISED_BY`].
pub const REVISES: &str = "revises";

/// Errors raised before any endpoint is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    SelfLink(DecisionId),
    /// `precedes`/`succeeds` used outside their implicit pair.
    ReservedTag(String),
    CycleDetected {
        source_id: DecisionId,
        target_id: DecisionId,
    },
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLink(id) => write!(f, "cannot link decision {id} to itself"),
            Self::ReservedTag(tag) => write!(
                f,
                "tag `{tag}` is reserved; `precedes`/`succeeds` may only be used as a pair"
            ),
            Self::CycleDetected {
                source_id,
                target_id,
            } => write!(f, "linking {source_id} -> {target_id} would create a cycle"),
        }
    }
}

impl Error for LinkError {}

/// Kind of relation requested by a link call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRelation {
    /// `source precedes target`, `target succeeds source`.
    Precedence,
    Custom {
        tag: String,
        reverse_tag: Option<String>,
    },
}

impl LinkRelation {
    /// Classifies caller input; blank `tag` means `precedes`.
    ///
    /// A blank reverse tag next to `precedes` means `succeeds`; next to a
    /// custom tag it means a one-way relation.
    pub fn from_tags(tag: &str, reverse_tag: &str) -> Result<Self, LinkError> {
        let tag = match tag.trim() {
            "" => PRECEDES,
            other => other,
        };
        let reverse_tag = reverse_tag.trim();

        if tag == PRECEDES {
            return match reverse_tag {
                "" | SUCCEEDS => Ok(Self::Precedence),
                other => Err(LinkError::ReservedTag(other.to_string())),
            };
        }
        for candidate in [tag, reverse_tag] {
            if candidate == PRECEDES || candidate == SUCCEEDS {
                return Err(LinkError::ReservedTag(candidate.to_string()));
            }
        }

        Ok(Self::Custom {
            tag: tag.to_string(),
            reverse_tag: (!reverse_tag.is_empty()).then(|| reverse_tag.to_string()),
        })
    }
}

/// Adjacency of `precedes` edges keyed by decision id.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceGraph {
    edges: HashMap<DecisionId, Vec<DecisionId>>,
}

impl PrecedenceGraph {
    pub fn from_decisions<'a>(decisions: impl IntoIterator<Item = &'a Decision>) -> Self {
        let mut graph = Self::default();
        for decision in decisions {
            graph.insert(decision);
        }
        graph
    }

    /// Replaces the outgoing edges of `decision`.
    pub fn insert(&mut self, decision: &Decision) {
        self.edges
            .insert(decision.id.clone(), decision.links.precedes.clone());
    }

    /// Whether adding `source precedes target` closes a loop.
    ///
    /// Walks `precedes` edges from `target` looking for `source`; unknown ids
    /// are leaves.
    pub fn would_create_cycle(&self, source_id: &str, target_id: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![target_id];

        while let Some(current) = stack.pop() {
            if current == source_id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        false
    }
}

/// Validates and applies `relation` to both endpoints in memory.
///
/// Nothing is mutated when an error is returned.
pub fn apply_link(
    graph: &PrecedenceGraph,
    source: &mut Decision,
    target: &mut Decision,
    relation: &LinkRelation,
) -> Result<(), LinkError> {
    if source.id == target.id {
        return Err(LinkError::SelfLink(source.id.clone()));
    }

    match relation {
        LinkRelation::Precedence => {
            if graph.would_create_cycle(&source.id, &target.id) {
                return Err(LinkError::CycleDetected {
                    source_id: source.id.clone(),
                    target_id: target.id.clone(),
                });
            }
            push_unique(&mut source.links.precedes, &target.id);
            push_unique(&mut target.links.succeeds, &source.id);
        }
        LinkRelation::Custom { tag, reverse_tag } => {
            push_unique(
                source.links.custom.entry(tag.clone()).or_default(),
                &target.id,
            );
            if let Some(reverse_tag) = reverse_tag {
                push_unique(
                    target.links.custom.entry(reverse_tag.clone()).or_default(),
                    &source.id,
                );
            }
        }
    }
    Ok(())
}

fn push_unique(targets: &mut Vec<DecisionId>, id: &str) {
    if !targets.iter().any(|existing| existing == id) {
        targets.push(id.to_string());
    }
}
