//! Denormalized metadata cache (`index.yaml`) and full-scan loading.
//!
//! # Responsibility
//! - Read/write the `decisions:` id -> metadata map at the model root.
//! - Scan decision files as the authoritative fallback.
//! - Diff cache against files and check required section anchors.
//!
//! # Invariants
//! - Index output is ordered by id, so identical input gives identical bytes.
//! - Duplicate ids are rejected, never merged.
//! - A broken index degrades `load_all` to a scan; it never fails it.

use crate::document::anchor::section_anchor;
use crate::document::codec;
use crate::model::decision::{Decision, DecisionId};
use crate::model::section::Section;
use crate::repo::id_allocator::is_decision_filename;
use crate::repo::{
    document_error, read_text, walk_error, write_text, RepoError, RepoResult,
    INDEX_FILE_NAME,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// On-disk shape of `index.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    #[serde(default)]
    pub decisions: BTreeMap<DecisionId, Decision>,
}

/// One cache/data disagreement found by [`compare_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyIssue {
    OnlyInIndex(DecisionId),
    OnlyInData(DecisionId),
    MetadataMismatch(DecisionId),
}

impl ConsistencyIssue {
    pub fn id(&self) -> &str {
        match self {
            Self::OnlyInIndex(id) | Self::OnlyInData(id) | Self::MetadataMismatch(id) => id,
        }
    }
}

impl Display for ConsistencyIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnlyInIndex(id) => write!(f, "decision {id} is only in the index"),
            Self::OnlyInData(id) => write!(f, "decision {id} is only in the data files"),
            Self::MetadataMismatch(id) => {
                write!(f, "decision {id} differs between index and data file")
            }
        }
    }
}

pub fn index_path(model: &Path) -> PathBuf {
    model.join(INDEX_FILE_NAME)
}

/// Reads the cached index, ids taken from the map keys.
///
/// # Errors
/// - `Io` when the index file is missing or unreadable.
/// - `MalformedIndex` when its YAML does not decode.
pub fn read_index(model: &Path) -> RepoResult<Vec<Decision>> {
    let path = index_path(model);
    let text = read_text(&path)?;
    let index: IndexFile = if text.trim().is_empty() {
        IndexFile::default()
    } else {
        serde_yaml::from_str(&text).map_err(|err| RepoError::MalformedIndex {
            path: path.clone(),
            reason: err.to_string(),
        })?
    };

    Ok(index
        .decisions
        .into_iter()
        .map(|(id, mut decision)| {
            decision.id = id;
            decision
        })
        .collect())
}

/// Builds the id map, rejecting duplicates.
pub fn index_from_decisions(decisions: &[Decision]) -> RepoResult<IndexFile> {
    let mut index = IndexFile::default();
    for decision in decisions {
        if index
            .decisions
            .insert(decision.id.clone(), decision.clone())
            .is_some()
        {
            return Err(RepoError::DuplicateId(decision.id.clone()));
        }
    }
    Ok(index)
}

/// Overwrites `index.yaml` with exactly `decisions`.
pub fn write_index(model: &Path, decisions: &[Decision]) -> RepoResult<()> {
    let index = index_from_decisions(decisions)?;
    store(model, &index)
}

/// Inserts or replaces one entry; a broken existing index is started over.
pub fn upsert(model: &Path, decision: &Decision) -> RepoResult<()> {
    let mut index = match read_index(model) {
        Ok(decisions) => IndexFile {
            decisions: decisions
                .into_iter()
                .map(|decision| (decision.id.clone(), decision))
                .collect(),
        },
        Err(err) => {
            debug!(
                "event=index_upsert module=repo status=reset model={} reason={}",
                model.display(),
                err
            );
            IndexFile::default()
        }
    };
    index
        .decisions
        .insert(decision.id.clone(), decision.clone());
    store(model, &index)
}

fn store(model: &Path, index: &IndexFile) -> RepoResult<()> {
    let text = serde_yaml::to_string(index).map_err(|err| RepoError::Serialize(err.to_string()))?;
    write_text(&index_path(model), &text)
}

/// Decision files below `model` as `(path, metadata)`, ordered by id.
///
/// Files without frontmatter delimiters are skipped; frontmatter that fails
/// to decode is an error.
pub fn scan_files(model: &Path) -> RepoResult<Vec<(PathBuf, Decision)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(model).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(model, err))?;
        let is_decision = entry.file_type().is_file()
            && entry.file_name().to_str().is_some_and(is_decision_filename);
        if !is_decision {
            continue;
        }

        let path = entry.into_path();
        let text = read_text(&path)?;
        let raw = match codec::split(&text) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=decision_scan module=repo status=skipped path={} reason={}",
                    path.display(),
                    err
                );
                continue;
            }
        };
        let decision =
            codec::decode_metadata(&raw.metadata).map_err(|err| document_error(&path, err))?;
        found.push((path, decision));
    }
    found.sort_by(|(_, a), (_, b)| a.id.cmp(&b.id));
    Ok(found)
}

/// Metadata of every decision file, ordered by id.
pub fn scan_decisions(model: &Path) -> RepoResult<Vec<Decision>> {
    Ok(scan_files(model)?
        .into_iter()
        .map(|(_, decision)| decision)
        .collect())
}

/// Cached index when usable, otherwise a full scan.
pub fn load_all(model: &Path) -> RepoResult<Vec<Decision>> {
    match read_index(model) {
        Ok(decisions) => Ok(decisions),
        Err(err) => {
            warn!(
                "event=index_fallback module=repo status=scan model={} reason={}",
                model.display(),
                err
            );
            scan_decisions(model)
        }
    }
}

/// First id claimed by more than one decision.
pub fn find_duplicate_id(decisions: &[Decision]) -> Option<DecisionId> {
    let mut seen = BTreeSet::new();
    decisions
        .iter()
        .find(|decision| !seen.insert(decision.id.as_str()))
        .map(|decision| decision.id.clone())
}

/// Diffs cached entries against scanned ones, ordered by id.
pub fn compare_index(index: &[Decision], data: &[Decision]) -> Vec<ConsistencyIssue> {
    let cached: BTreeMap<&str, &Decision> = index.iter().map(|d| (d.id.as_str(), d)).collect();
    let scanned: BTreeMap<&str, &Decision> = data.iter().map(|d| (d.id.as_str(), d)).collect();
    let ids: BTreeSet<&str> = cached.keys().chain(scanned.keys()).copied().collect();

    ids.into_iter()
        .filter_map(|id| match (cached.get(id), scanned.get(id)) {
            (Some(_), None) => Some(ConsistencyIssue::OnlyInIndex(id.to_string())),
            (None, Some(_)) => Some(ConsistencyIssue::OnlyInData(id.to_string())),
            (Some(a), Some(b)) if a != b => Some(ConsistencyIssue::MetadataMismatch(id.to_string())),
            _ => None,
        })
        .collect()
}

/// Required sections whose anchor is absent from `body`.
pub fn missing_required_anchors(body: &str) -> Vec<Section> {
    Section::REQUIRED
        .into_iter()
        .filter(|section| !body.contains(&section_anchor(*section)))
        .collect()
}
