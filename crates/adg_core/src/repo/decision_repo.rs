//! Decision repository contract and filesystem implementation.
//!
//! # Responsibility
//! - Expose create/save/copy/load and section edits over one model directory.
//! - Keep every metadata write mirrored into `index.yaml`.
//!
//! # Invariants
//! - File name is `AD<id>-<slug>.md`; subfolders are preserved on copy.
//! - `save` merges metadata into the existing frontmatter and keeps the body.
//! - Section edits keep the frontmatter bytes untouched.
//! - Title lookup: one exact slug match wins; otherwise exactly one partial
//!   match is required.

use crate::config::DocumentConfig;
use crate::document::anchor::comment_line;
use crate::document::codec;
use crate::document::editor::{text_lines, SectionedBody};
use crate::document::options;
use crate::model::decision::{Comment, Decision, DecisionContent};
use crate::model::section::Section;
use crate::repo::id_allocator::next_id;
use crate::repo::{
    document_error, ensure_dir, index_store, io_error, read_text, walk_error, write_text,
    RepoError, RepoResult,
};
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Storage operations over decision documents of one model.
pub trait DecisionRepository {
    /// Assigns the next id, writes the document and indexes it.
    fn create(
        &self,
        model: &Path,
        sub_folder: Option<&Path>,
        decision: Decision,
        content: &DecisionContent,
    ) -> RepoResult<Decision>;
    /// Rewrites metadata of an existing document and its index entry.
    fn save(&self, model: &Path, decision: &Decision) -> RepoResult<()>;
    /// Byte-copies one document into `target_model`; returns the new path.
    fn copy(&self, source_model: &Path, target_model: &Path, id: &str) -> RepoResult<PathBuf>;
    fn load_by_id(&self, model: &Path, id: &str) -> RepoResult<Decision>;
    fn load_by_title(&self, model: &Path, title: &str) -> RepoResult<Decision>;
    /// Cached metadata only; fails when the index is missing or malformed.
    fn load_all_by_index(&self, model: &Path) -> RepoResult<Vec<Decision>>;
    /// Metadata from a full file scan, ordered by id.
    fn load_all_by_data(&self, model: &Path) -> RepoResult<Vec<Decision>>;
    /// Index when usable, otherwise a full scan.
    fn load_all(&self, model: &Path) -> RepoResult<Vec<Decision>>;
    /// Document body after the frontmatter.
    fn load_content_raw(&self, model: &Path, id: &str) -> RepoResult<String>;
    fn load_content(&self, model: &Path, id: &str) -> RepoResult<DecisionContent>;
    /// Replaces one section body, inserting the section when absent.
    fn update_section(
        &self,
        model: &Path,
        id: &str,
        section: Section,
        lines: &[String],
    ) -> RepoResult<()>;
    /// Adds one anchored comment line below the existing comments.
    fn append_comment_section(
        &self,
        model: &Path,
        id: &str,
        comment: &Comment,
        text: &str,
    ) -> RepoResult<()>;
    /// Replaces the outcome section.
    fn append_outcome_section(&self, model: &Path, id: &str, outcome: &str) -> RepoResult<()>;
    fn option_exists(&self, model: &Path, id: &str, option: &str) -> RepoResult<bool>;
    fn resolve_option_number(&self, model: &Path, id: &str, option: &str) -> RepoResult<u32>;
    fn find_decision_file(&self, model: &Path, id: &str) -> RepoResult<PathBuf>;
}

/// Markdown-file-backed decision repository.
#[derive(Debug, Clone, Default)]
pub struct FileDecisionRepository {
    config: DocumentConfig,
}

impl FileDecisionRepository {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    fn edit_body(
        &self,
        model: &Path,
        id: &str,
        edit: impl FnOnce(&mut SectionedBody, &DocumentConfig),
    ) -> RepoResult<()> {
        let path = self.find_decision_file(model, id)?;
        let raw = codec::split(&read_text(&path)?).map_err(|err| document_error(&path, err))?;

        let mut body = SectionedBody::parse(&raw.body);
        edit(&mut body, &self.config);
        write_text(&path, &format!("---\n{}---\n{}", raw.metadata, body.render()))
    }
}

impl DecisionRepository for FileDecisionRepository {
    fn create(
        &self,
        model: &Path,
        sub_folder: Option<&Path>,
        mut decision: Decision,
        content: &DecisionContent,
    ) -> RepoResult<Decision> {
        decision.id = next_id(model)?;

        let folder = match sub_folder {
            Some(sub) => model.join(sub),
            None => model.to_path_buf(),
        };
        let path = folder.join(decision_file_name(&decision.id, &decision.title));
        let text = codec::compose(&decision, content, &self.config)
            .map_err(|err| document_error(&path, err))?;

        ensure_dir(&folder)?;
        write_text(&path, &text)?;
        index_store::upsert(model, &decision)?;

        info!(
            "event=decision_create module=repo status=ok id={} path={}",
            decision.id,
            path.display()
        );
        Ok(decision)
    }

    fn save(&self, model: &Path, decision: &Decision) -> RepoResult<()> {
        let path = self.find_decision_file(model, &decision.id)?;
        let raw = codec::split(&read_text(&path)?).map_err(|err| document_error(&path, err))?;
        let metadata =
            codec::merge_metadata(&raw.metadata, decision).map_err(|err| document_error(&path, err))?;

        write_text(&path, &codec::assemble(&metadata, &raw.body))?;
        index_store::upsert(model, decision)?;

        debug!(
            "event=decision_save module=repo status=ok id={}",
            decision.id
        );
        Ok(())
    }

    fn copy(&self, source_model: &Path, target_model: &Path, id: &str) -> RepoResult<PathBuf> {
        let source = self.find_decision_file(source_model, id)?;
        let relative = source.strip_prefix(source_model).unwrap_or(source.as_path());
        let target = target_model.join(relative);

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        std::fs::copy(&source, &target).map_err(|err| io_error(&target, err))?;

        debug!(
            "event=decision_copy module=repo status=ok id={} target={}",
            id,
            target.display()
        );
        Ok(target)
    }

    fn load_by_id(&self, model: &Path, id: &str) -> RepoResult<Decision> {
        self.load_all(model)?
            .into_iter()
            .find(|decision| decision.id == id)
            .ok_or_else(|| RepoError::NotFound(format!("id {id}")))
    }

    fn load_by_title(&self, model: &Path, title: &str) -> RepoResult<Decision> {
        let wanted = slugify(title);
        let mut exact: Option<Decision> = None;
        let mut partial: Vec<Decision> = Vec::new();

        for decision in self.load_all(model)? {
            let slug = slugify(&decision.title);
            if slug == wanted {
                if exact.is_some() {
                    return Err(RepoError::AmbiguousTitle(title.to_string()));
                }
                exact = Some(decision);
            } else if slug.contains(&wanted) {
                partial.push(decision);
            }
        }

        if let Some(decision) = exact {
            return Ok(decision);
        }
        match partial.len() {
            0 => Err(RepoError::NotFound(format!("title `{title}`"))),
            1 => Ok(partial.remove(0)),
            _ => Err(RepoError::AmbiguousTitle(title.to_string())),
        }
    }

    fn load_all_by_index(&self, model: &Path) -> RepoResult<Vec<Decision>> {
        index_store::read_index(model)
    }

    fn load_all_by_data(&self, model: &Path) -> RepoResult<Vec<Decision>> {
        index_store::scan_decisions(model)
    }

    fn load_all(&self, model: &Path) -> RepoResult<Vec<Decision>> {
        index_store::load_all(model)
    }

    fn load_content_raw(&self, model: &Path, id: &str) -> RepoResult<String> {
        let path = self.find_decision_file(model, id)?;
        let raw = codec::split(&read_text(&path)?).map_err(|err| document_error(&path, err))?;
        Ok(raw.body)
    }

    fn load_content(&self, model: &Path, id: &str) -> RepoResult<DecisionContent> {
        Ok(codec::decode_content(&self.load_content_raw(model, id)?))
    }

    fn update_section(
        &self,
        model: &Path,
        id: &str,
        section: Section,
        lines: &[String],
    ) -> RepoResult<()> {
        self.edit_body(model, id, |body, config| {
            body.replace_section(section, config.header_for(section), lines);
        })?;
        debug!(
            "event=section_update module=repo status=ok id={} section={}",
            id, section
        );
        Ok(())
    }

    fn append_comment_section(
        &self,
        model: &Path,
        id: &str,
        comment: &Comment,
        text: &str,
    ) -> RepoResult<()> {
        let line = comment_line(comment.sequence, &comment.author, &comment.timestamp, text);
        self.edit_body(model, id, |body, config| {
            body.append_to_section(
                Section::Comments,
                config.header_for(Section::Comments),
                &[line],
            );
        })
    }

    fn append_outcome_section(&self, model: &Path, id: &str, outcome: &str) -> RepoResult<()> {
        self.update_section(model, id, Section::Outcome, &text_lines(outcome))
    }

    fn option_exists(&self, model: &Path, id: &str, option: &str) -> RepoResult<bool> {
        let path = self.find_decision_file(model, id)?;
        Ok(options::option_exists(&read_text(&path)?, option))
    }

    fn resolve_option_number(&self, model: &Path, id: &str, option: &str) -> RepoResult<u32> {
        let path = self.find_decision_file(model, id)?;
        options::find_option(&read_text(&path)?, option).ok_or_else(|| RepoError::OptionNotFound {
            id: id.to_string(),
            option: option.to_string(),
        })
    }

    fn find_decision_file(&self, model: &Path, id: &str) -> RepoResult<PathBuf> {
        let prefix = format!("AD{id}-");
        for entry in WalkDir::new(model).sort_by_file_name() {
            let entry = entry.map_err(|err| walk_error(model, err))?;
            let matches = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".md"));
            if matches {
                return Ok(entry.into_path());
            }
        }
        Err(RepoError::NotFound(format!("id {id}")))
    }
}

/// Lowercase title with spaces and path separators replaced by `-`.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            other => other,
        })
        .collect()
}

/// `AD0001-use-kafka.md`
pub fn decision_file_name(id: &str, title: &str) -> String {
    format!("AD{id}-{}.md", slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(slugify("Use Kafka for Events"), "use-kafka-for-events");
        assert_eq!(slugify("CI/CD pipeline"), "ci-cd-pipeline");
        assert_eq!(
            decision_file_name("0003", "Use Kafka"),
            "AD0003-use-kafka.md"
        );
    }
}
