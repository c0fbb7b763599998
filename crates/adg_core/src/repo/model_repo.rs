//! Model directory contract and filesystem implementation.
//!
//! # Invariants
//! - A model "exists" exactly when its `index.yaml` exists.
//! - `write_index` replaces the whole cache; duplicates are rejected first.

use crate::model::decision::Decision;
use crate::repo::index_store::{self, IndexFile};
use crate::repo::{ensure_dir, write_text, RepoError, RepoResult};
use log::info;
use std::path::Path;

/// Model-level storage operations.
pub trait ModelRepository {
    /// Creates the model directory (and parents).
    fn create_model(&self, model: &Path) -> RepoResult<()>;
    /// Writes an empty `decisions: {}` index.
    fn create_index(&self, model: &Path) -> RepoResult<()>;
    /// Replaces the index with exactly `decisions`.
    fn write_index(&self, model: &Path, decisions: &[Decision]) -> RepoResult<()>;
    fn exists(&self, model: &Path) -> bool;
}

/// Directory-backed model repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModelRepository;

impl FileModelRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ModelRepository for FileModelRepository {
    fn create_model(&self, model: &Path) -> RepoResult<()> {
        ensure_dir(model)?;
        info!(
            "event=model_create module=repo status=ok model={}",
            model.display()
        );
        Ok(())
    }

    fn create_index(&self, model: &Path) -> RepoResult<()> {
        let text = serde_yaml::to_string(&IndexFile::default())
            .map_err(|err| RepoError::Serialize(err.to_string()))?;
        write_text(&index_store::index_path(model), &text)
    }

    fn write_index(&self, model: &Path, decisions: &[Decision]) -> RepoResult<()> {
        index_store::write_index(model, decisions)?;
        info!(
            "event=index_write module=repo status=ok model={} count={}",
            model.display(),
            decisions.len()
        );
        Ok(())
    }

    fn exists(&self, model: &Path) -> bool {
        index_store::index_path(model).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_model_and_index_make_model_exist() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("nested").join("model");
        let repo = FileModelRepository::new();

        assert!(!repo.exists(&model));
        repo.create_model(&model).unwrap();
        assert!(!repo.exists(&model));
        repo.create_index(&model).unwrap();
        assert!(repo.exists(&model));

        let text = std::fs::read_to_string(index_store::index_path(&model)).unwrap();
        assert_eq!(text, "decisions: {}\n");
    }
}
