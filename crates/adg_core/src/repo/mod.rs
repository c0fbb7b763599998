//! Repository layer over model directories.
//!
//! # Responsibility
//! - Define the storage contracts the service layer consumes.
//! - Keep filesystem layout, index caching and id allocation behind them.
//!
//! # Invariants
//! - Decision files are authoritative; `index.yaml` is a rebuildable cache.
//! - Every error names the id, title or path it concerns.
//! - No locking: a single writer per model directory is assumed.

use crate::document::DocumentError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub mod decision_repo;
pub mod id_allocator;
pub mod index_store;
pub mod model_repo;

/// Index file name at the model root.
pub const INDEX_FILE_NAME: &str = "index.yaml";

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error for decision and model persistence.
#[derive(Debug)]
pub enum RepoError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Decision file with missing delimiters or invalid frontmatter.
    MalformedDocument { path: PathBuf, reason: String },
    /// `index.yaml` exists but cannot be decoded.
    MalformedIndex { path: PathBuf, reason: String },
    /// No decision matches the given id or title.
    NotFound(String),
    /// More than one title matched with equal strength.
    AmbiguousTitle(String),
    /// Two files claim the same decision id.
    DuplicateId(String),
    OptionNotFound { id: String, option: String },
    /// Every 4-digit id up to this one is taken.
    IdSpaceExhausted(u32),
    Serialize(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::MalformedDocument { path, reason } => {
                write!(f, "malformed decision file `{}`: {reason}", path.display())
            }
            Self::MalformedIndex { path, reason } => {
                write!(f, "malformed index `{}`: {reason}", path.display())
            }
            Self::NotFound(what) => write!(f, "decision not found: {what}"),
            Self::AmbiguousTitle(title) => write!(
                f,
                "multiple decision titles matched `{title}`; be more specific or use the id"
            ),
            Self::DuplicateId(id) => write!(f, "duplicate decision id: {id}"),
            Self::OptionNotFound { id, option } => {
                write!(f, "option `{option}` not found in decision {id}")
            }
            Self::IdSpaceExhausted(highest) => write!(
                f,
                "no decision id left after {highest:04}; ids are limited to 4 digits"
            ),
            Self::Serialize(message) => write!(f, "serialization failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> RepoError {
    RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn document_error(path: &Path, err: DocumentError) -> RepoError {
    match err {
        DocumentError::Encode(err) => RepoError::Serialize(err.to_string()),
        other => RepoError::MalformedDocument {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

pub(crate) fn walk_error(root: &Path, err: walkdir::Error) -> RepoError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    RepoError::Io { path, source }
}

pub(crate) fn read_text(path: &Path) -> RepoResult<String> {
    std::fs::read_to_string(path).map_err(|err| io_error(path, err))
}

pub(crate) fn write_text(path: &Path, text: &str) -> RepoResult<()> {
    std::fs::write(path, text).map_err(|err| io_error(path, err))
}

pub(crate) fn ensure_dir(path: &Path) -> RepoResult<()> {
    std::fs::create_dir_all(path).map_err(|err| io_error(path, err))
}
