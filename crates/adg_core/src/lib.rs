//! Core document store for architectural-decision records.
//! This crate is the single source of truth for format and model invariants.

pub mod config;
pub mod document;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DocumentConfig};
pub use document::DocumentError;
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::decision::{
    Comment, Decision, DecisionContent, DecisionId, DecisionStatus, Links,
};
pub use model::section::Section;
pub use repo::decision_repo::{DecisionRepository, FileDecisionRepository};
pub use repo::index_store::ConsistencyIssue;
pub use repo::model_repo::{FileModelRepository, ModelRepository};
pub use repo::{RepoError, RepoResult};
pub use service::decision_service::{
    BulkAddResult, DecisionEdit, DecisionFilter, DecisionRef, DecisionService,
    DecisionServiceError,
};
pub use service::model_service::{
    ContentIssue, ModelService, ModelServiceError, ValidationReport,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
