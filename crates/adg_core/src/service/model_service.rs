//! Model use-case service: lifecycle, index maintenance and model transfer.
//!
//! # Responsibility
//! - Create models and rebuild their index from decision files.
//! - Diagnose index drift and missing required sections.
//! - Copy, import and merge decisions across models.
//!
//! # Invariants
//! - Validation never repairs; repair is an explicit `rebuild_index`.
//! - Transfers process source decisions in ascending id order.
//! - Source models are never written by a transfer.

use crate::model::decision::{parse_decision_id, Decision, DecisionId};
use crate::model::section::Section;
use crate::repo::decision_repo::DecisionRepository;
use crate::repo::index_store::{compare_index, find_duplicate_id, missing_required_anchors, ConsistencyIssue};
use crate::repo::model_repo::ModelRepository;
use crate::repo::RepoError;
use crate::service::decision_service::{DecisionFilter, DecisionService, DecisionServiceError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Service error for model use-cases.
#[derive(Debug)]
pub enum ModelServiceError {
    /// Target already holds an index.
    ModelAlreadyExists(PathBuf),
    /// Target holds no index.
    ModelMissing(PathBuf),
    DuplicateId(DecisionId),
    /// Non-numeric id where an id shift needs a number.
    InvalidDecisionId(DecisionId),
    MetadataMismatch { issues: Vec<ConsistencyIssue> },
    ContentInvalid { issues: Vec<ContentIssue> },
    Decision(DecisionServiceError),
    Repo(RepoError),
}

impl Display for ModelServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelAlreadyExists(path) => write!(
                f,
                "target `{}` already contains a model; use import for an existing model",
                path.display()
            ),
            Self::ModelMissing(path) => write!(
                f,
                "`{}` does not contain a model index; rebuild it if the directory holds decisions",
                path.display()
            ),
            Self::DuplicateId(id) => write!(
                f,
                "duplicate decision id {id} detected in directory or subdirectories"
            ),
            Self::InvalidDecisionId(id) => write!(f, "invalid decision id `{id}`"),
            Self::MetadataMismatch { issues } => write!(
                f,
                "validation of metadata completed with {} mismatches; rebuild the index",
                issues.len()
            ),
            Self::ContentInvalid { issues } => write!(
                f,
                "validation of file contents found {} invalid decisions",
                issues.len()
            ),
            Self::Decision(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decision(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ModelServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateId(id) => Self::DuplicateId(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DecisionServiceError> for ModelServiceError {
    fn from(value: DecisionServiceError) -> Self {
        match value {
            DecisionServiceError::Repo(err) => Self::from(err),
            other => Self::Decision(other),
        }
    }
}

/// Required sections missing from one decision body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIssue {
    pub id: DecisionId,
    pub missing: Vec<Section>,
}

impl Display for ContentIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(|section| section.name()).collect();
        write!(
            f,
            "decision {} is missing required sections: {}",
            self.id,
            names.join(", ")
        )
    }
}

/// Ids that passed a validation, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checked: Vec<DecisionId>,
}

/// Model service facade over model and decision repositories.
pub struct ModelService<M: ModelRepository, R: DecisionRepository> {
    models: M,
    decisions: DecisionService<R>,
}

impl<M: ModelRepository, R: DecisionRepository> ModelService<M, R> {
    pub fn new(models: M, decision_repo: R) -> Self {
        Self {
            models,
            decisions: DecisionService::new(decision_repo),
        }
    }

    /// Decision operations sharing this service's repository.
    pub fn decisions(&self) -> &DecisionService<R> {
        &self.decisions
    }

    /// Creates the directory and an empty index.
    pub fn create_model(&self, model: &Path) -> Result<(), ModelServiceError> {
        self.models.create_model(model)?;
        self.models.create_index(model)?;
        Ok(())
    }

    /// Whether `model` has an index file.
    pub fn exists(&self, model: &Path) -> bool {
        self.models.exists(model)
    }

    /// Rewrites the index from a full file scan; returns the entry count.
    ///
    /// # Errors
    /// - `DuplicateId` when two files claim one id; the index is untouched.
    pub fn rebuild_index(&self, model: &Path) -> Result<usize, ModelServiceError> {
        let decisions = self.decisions.repo().load_all_by_data(model)?;
        if let Some(id) = find_duplicate_id(&decisions) {
            return Err(ModelServiceError::DuplicateId(id));
        }
        self.models.write_index(model, &decisions)?;
        Ok(decisions.len())
    }

    /// Compares index entries with file metadata.
    ///
    /// # Errors
    /// - `DuplicateId` when files disagree on id ownership.
    /// - `Repo` when the index is missing or malformed.
    /// - `MetadataMismatch` carrying every drift found.
    pub fn validate_consistency(
        &self,
        model: &Path,
    ) -> Result<ValidationReport, ModelServiceError> {
        let repo = self.decisions.repo();
        let data = repo.load_all_by_data(model)?;
        if let Some(id) = find_duplicate_id(&data) {
            return Err(ModelServiceError::DuplicateId(id));
        }
        let index = repo.load_all_by_index(model)?;

        let issues = compare_index(&index, &data);
        for issue in &issues {
            warn!(
                "event=validate_consistency module=service status=mismatch id={} detail={:?}",
                issue.id(),
                issue
            );
        }
        if !issues.is_empty() {
            return Err(ModelServiceError::MetadataMismatch { issues });
        }

        let checked: Vec<DecisionId> = data.into_iter().map(|decision| decision.id).collect();
        debug!(
            "event=validate_consistency module=service status=ok count={}",
            checked.len()
        );
        Ok(ValidationReport { checked })
    }

    /// Checks every indexed decision for the required section anchors.
    pub fn validate_content(&self, model: &Path) -> Result<ValidationReport, ModelServiceError> {
        let repo = self.decisions.repo();
        let mut decisions = repo.load_all_by_index(model)?;
        decisions.sort_by(|a, b| a.id.cmp(&b.id));

        let mut checked = Vec::new();
        let mut issues = Vec::new();
        for decision in decisions {
            let body = repo.load_content_raw(model, &decision.id)?;
            let missing = missing_required_anchors(&body);
            if missing.is_empty() {
                checked.push(decision.id);
            } else {
                warn!(
                    "event=validate_content module=service status=missing id={} count={}",
                    decision.id,
                    missing.len()
                );
                issues.push(ContentIssue {
                    id: decision.id,
                    missing,
                });
            }
        }

        if issues.is_empty() {
            Ok(ValidationReport { checked })
        } else {
            Err(ModelServiceError::ContentInvalid { issues })
        }
    }

    /// Byte-copies (filtered) decisions into a new model.
    pub fn copy_model(
        &self,
        source: &Path,
        target: &Path,
        filter: &DecisionFilter,
    ) -> Result<usize, ModelServiceError> {
        if self.models.exists(target) {
            return Err(ModelServiceError::ModelAlreadyExists(target.to_path_buf()));
        }
        self.create_model(target)?;

        let selected = self.select(source, filter)?;
        for decision in &selected {
            self.decisions.copy(source, target, &decision.id)?;
        }
        self.rebuild_index(target)?;

        info!(
            "event=model_copy module=service status=ok count={} target={}",
            selected.len(),
            target.display()
        );
        Ok(selected.len())
    }

    /// Appends (filtered) decisions of `source` to an existing model.
    ///
    /// Links are shifted by the highest id already in `target`.
    pub fn import_model(
        &self,
        source: &Path,
        target: &Path,
        filter: &DecisionFilter,
    ) -> Result<usize, ModelServiceError> {
        if !self.models.exists(target) {
            return Err(ModelServiceError::ModelMissing(target.to_path_buf()));
        }
        let delta = highest_numeric_id(&self.decisions.get_all(target)?)?;

        let count = self.transfer(source, target, filter, delta)?;
        self.rebuild_index(target)?;

        info!(
            "event=model_import module=service status=ok count={} delta={} target={}",
            count,
            delta,
            target.display()
        );
        Ok(count)
    }

    /// Combines two models into a new one: `first` unshifted, then `second`
    /// shifted by the highest id of `first`.
    pub fn merge_models(
        &self,
        first: &Path,
        second: &Path,
        target: &Path,
        filter: &DecisionFilter,
    ) -> Result<usize, ModelServiceError> {
        if self.models.exists(target) {
            return Err(ModelServiceError::ModelAlreadyExists(target.to_path_buf()));
        }
        let delta = highest_numeric_id(&self.decisions.get_all(first)?)?;
        self.create_model(target)?;

        let count = self.transfer(first, target, filter, 0)?
            + self.transfer(second, target, filter, delta)?;
        self.rebuild_index(target)?;

        info!(
            "event=model_merge module=service status=ok count={} delta={} target={}",
            count,
            delta,
            target.display()
        );
        Ok(count)
    }

    /// Recreates selected decisions of `source` in `target`; stops on the
    /// first failure.
    fn transfer(
        &self,
        source: &Path,
        target: &Path,
        filter: &DecisionFilter,
        delta: u32,
    ) -> Result<usize, ModelServiceError> {
        let selected = self.select(source, filter)?;
        for decision in &selected {
            let content = self.decisions.get_content(source, &decision.id)?;
            self.decisions
                .add_existing(source, target, decision, &content, delta)?;
        }
        Ok(selected.len())
    }

    /// Decisions of `model` passing `filter` (all when empty), ascending id.
    fn select(
        &self,
        model: &Path,
        filter: &DecisionFilter,
    ) -> Result<Vec<Decision>, ModelServiceError> {
        let mut decisions = self.decisions.get_all(model)?;
        if !filter.is_empty() {
            decisions = filter.apply(&decisions)?;
        }
        decisions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(decisions)
    }
}

fn highest_numeric_id(decisions: &[Decision]) -> Result<u32, ModelServiceError> {
    decisions.iter().try_fold(0, |highest, decision| {
        parse_decision_id(&decision.id)
            .map(|id| highest.max(id))
            .ok_or_else(|| ModelServiceError::InvalidDecisionId(decision.id.clone()))
    })
}
