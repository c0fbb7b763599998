//! Domain model for architectural-decision records.
//!
//! # Responsibility
//! - Define the metadata record persisted in frontmatter and in `index.yaml`.
//! - Define the fixed five-section content template.
//!
//! # Invariants
//! - Every decision is identified by a 4-digit zero-padded `DecisionId`,
//!   unique within one model directory.
//! - `precedes`/`succeeds` are fixed link fields; every other relation tag
//!   lives in `Links::custom`.
//! - Decision files are authoritative; the index is only a cache.

pub mod decision;
pub mod section;
