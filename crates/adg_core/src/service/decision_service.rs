//! Decision use-case service.
//!
//! # Responsibility
//! - Validate input and sequence repository calls per decision operation.
//! - Own append semantics for question/criteria/options edits.
//! - Keep comment metadata and the rendered comments section aligned.
//!
//! # Invariants
//! - Titles contain at least one letter.
//! - Option numbers continue from the highest existing anchor count.
//! - `decide` writes the outcome before flipping status; only `decide_open`
//!   refuses already decided decisions.
//! - Link endpoints are saved source first; a failed target save is reported
//!   as `PartialLink` without rolling the source back.

use crate::document::anchor::{option_line, outcome_text};
use crate::document::editor::text_lines;
use crate::document::options::{count_options, option_position};
use crate::model::decision::{
    format_decision_id, parse_decision_id, Comment, Decision, DecisionContent, DecisionId,
    DecisionStatus,
};
use crate::model::section::Section;
use crate::repo::decision_repo::DecisionRepository;
use crate::repo::id_allocator::shift_ids;
use crate::repo::RepoError;
use crate::service::link_graph::{
    apply_link, LinkError, LinkRelation, PrecedenceGraph, REVISED_BY, REVISES,
};
use log::{info, warn};
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const COMMENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DECIDED_COMMENT: &str = "marked decision as decided";
const REVISED_TITLE_SUFFIX: &str = " (Revised)";

/// Service error for decision use-cases.
#[derive(Debug)]
pub enum DecisionServiceError {
    /// Title has no letter.
    InvalidTitle(String),
    SelfLink(DecisionId),
    CycleDetected {
        source_id: DecisionId,
        target_id: DecisionId,
    },
    ReservedTag(String),
    TagAlreadyExists {
        id: DecisionId,
        tag: String,
    },
    OptionAlreadyExists {
        id: DecisionId,
        option: String,
    },
    OptionNotFound {
        id: DecisionId,
        option: String,
    },
    /// `force` cannot create an option from a bare number.
    NumericOptionNotAllowed(String),
    /// Option missing and `force` not set.
    MissingOption {
        id: DecisionId,
        option: String,
    },
    AlreadyDecided(DecisionId),
    InvalidIdRange(String),
    InvalidTitlePattern(String),
    /// Source endpoint saved, target endpoint failed.
    PartialLink {
        saved_id: DecisionId,
        failed_id: DecisionId,
        source: RepoError,
    },
    Repo(RepoError),
}

impl Display for DecisionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle(title) => {
                write!(f, "title must contain at least one letter: `{title}`")
            }
            Self::SelfLink(id) => write!(f, "cannot link decision {id} to itself"),
            Self::CycleDetected {
                source_id,
                target_id,
            } => write!(f, "linking {source_id} -> {target_id} would create a cycle"),
            Self::ReservedTag(tag) => write!(
                f,
                "tag `{tag}` is reserved; `precedes`/`succeeds` may only be used as a pair"
            ),
            Self::TagAlreadyExists { id, tag } => {
                write!(f, "tag `{tag}` already exists on decision {id}")
            }
            Self::OptionAlreadyExists { id, option } => {
                write!(f, "option `{option}` already exists in decision {id}")
            }
            Self::OptionNotFound { id, option } => {
                write!(f, "option `{option}` not found in decision {id}")
            }
            Self::NumericOptionNotAllowed(option) => write!(
                f,
                "cannot auto-create numeric option `{option}`; use a descriptive name"
            ),
            Self::MissingOption { id, option } => write!(
                f,
                "option `{option}` does not exist in decision {id}; name an existing option or force creation"
            ),
            Self::AlreadyDecided(id) => write!(
                f,
                "decision {id} has already been decided; revise it to get an open copy"
            ),
            Self::InvalidIdRange(range) => write!(f, "invalid ID range: {range}"),
            Self::InvalidTitlePattern(message) => write!(f, "invalid title pattern: {message}"),
            Self::PartialLink {
                saved_id,
                failed_id,
                source,
            } => write!(
                f,
                "decision {saved_id} was linked but saving decision {failed_id} failed: {source}; retry or rebuild the index"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DecisionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PartialLink { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DecisionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::OptionNotFound { id, option } => Self::OptionNotFound { id, option },
            other => Self::Repo(other),
        }
    }
}

impl From<LinkError> for DecisionServiceError {
    fn from(value: LinkError) -> Self {
        match value {
            LinkError::SelfLink(id) => Self::SelfLink(id),
            LinkError::ReservedTag(tag) => Self::ReservedTag(tag),
            LinkError::CycleDetected {
                source_id,
                target_id,
            } => Self::CycleDetected {
                source_id,
                target_id,
            },
        }
    }
}

/// Identifies a decision by id or by (partial) title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionRef {
    Id(DecisionId),
    Title(String),
}

impl DecisionRef {
    /// Digits-only input is an id (zero padded), anything else a title.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match parse_decision_id(trimmed) {
            Some(number) => Self::Id(format_decision_id(number)),
            None => Self::Title(trimmed.to_string()),
        }
    }
}

/// Content appended by an edit; `None`/empty fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionEdit {
    pub question: Option<String>,
    pub criteria: Option<String>,
    pub options: Vec<String>,
}

/// Outcome of a bulk add: the batch never aborts on one bad title.
#[derive(Debug, Default)]
pub struct BulkAddResult {
    pub added: Vec<Decision>,
    pub failed: Vec<(String, DecisionServiceError)>,
}

/// Selection criteria; a decision matches when ANY criterion matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionFilter {
    /// Ids, comma lists and `a-b` ranges.
    pub ids: Vec<String>,
    /// Regex matched against titles.
    pub title_pattern: Option<String>,
    pub tags: Vec<String>,
    pub statuses: Vec<DecisionStatus>,
}

impl DecisionFilter {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.title_pattern.is_none()
            && self.tags.is_empty()
            && self.statuses.is_empty()
    }

    /// Decisions matching any criterion, in input order.
    pub fn apply(&self, decisions: &[Decision]) -> Result<Vec<Decision>, DecisionServiceError> {
        let ids: BTreeSet<DecisionId> = expand_id_filters(&self.ids)?.into_iter().collect();
        let title_re = self
            .title_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| DecisionServiceError::InvalidTitlePattern(err.to_string()))?;

        Ok(decisions
            .iter()
            .filter(|decision| {
                ids.contains(&decision.id)
                    || title_re
                        .as_ref()
                        .is_some_and(|re| re.is_match(&decision.title))
                    || self.tags.iter().any(|tag| decision.has_tag(tag))
                    || self.statuses.contains(&decision.status)
            })
            .cloned()
            .collect())
    }
}

/// Expands `0001,0003-0005` style expressions to zero-padded ids.
pub fn expand_id_filters<S: AsRef<str>>(
    expressions: &[S],
) -> Result<Vec<DecisionId>, DecisionServiceError> {
    let mut ids = Vec::new();
    for expression in expressions {
        for part in expression.as_ref().split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            if part.contains('-') {
                ids.extend(expand_range(part)?);
            } else {
                ids.push(match parse_decision_id(part) {
                    Some(number) => format_decision_id(number),
                    None => part.to_string(),
                });
            }
        }
    }
    Ok(ids)
}

fn expand_range(range: &str) -> Result<Vec<DecisionId>, DecisionServiceError> {
    let invalid = || DecisionServiceError::InvalidIdRange(range.to_string());
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let start = parse_decision_id(start.trim()).ok_or_else(invalid)?;
    let end = parse_decision_id(end.trim()).ok_or_else(invalid)?;
    if start > end {
        return Err(invalid());
    }
    Ok((start..=end).map(format_decision_id).collect())
}

/// Decision service facade over repository implementations.
pub struct DecisionService<R: DecisionRepository> {
    repo: R,
}

impl<R: DecisionRepository> DecisionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates an open, empty decision with the next free id.
    pub fn add_new(&self, model: &Path, title: &str) -> Result<Decision, DecisionServiceError> {
        validate_title(title)?;
        let decision = self.repo.create(
            model,
            None,
            Decision::new(title),
            &DecisionContent::default(),
        )?;
        Ok(decision)
    }

    /// Adds every title, collecting failures instead of stopping.
    pub fn add_bulk<S: AsRef<str>>(&self, model: &Path, titles: &[S]) -> BulkAddResult {
        let mut result = BulkAddResult::default();
        for title in titles {
            let title = title.as_ref();
            match self.add_new(model, title) {
                Ok(decision) => result.added.push(decision),
                Err(err) => {
                    warn!(
                        "event=decision_add module=service status=error reason={}",
                        err
                    );
                    result.failed.push((title.to_string(), err));
                }
            }
        }
        info!(
            "event=decision_add_bulk module=service status=ok added={} failed={}",
            result.added.len(),
            result.failed.len()
        );
        result
    }

    /// Recreates a decision of another model in `target_model`.
    ///
    /// Link references are shifted by `delta`; the own id comes from the
    /// target allocator. The source subfolder is kept.
    pub fn add_existing(
        &self,
        source_model: &Path,
        target_model: &Path,
        decision: &Decision,
        content: &DecisionContent,
        delta: u32,
    ) -> Result<Decision, DecisionServiceError> {
        let sub_folder = self.sub_folder(source_model, &decision.id)?;
        let shifted = shift_ids(decision, delta);
        Ok(self
            .repo
            .create(target_model, sub_folder.as_deref(), shifted, content)?)
    }

    /// All decisions, from the index when usable.
    pub fn get_all(&self, model: &Path) -> Result<Vec<Decision>, DecisionServiceError> {
        Ok(self.repo.load_all(model)?)
    }

    pub fn get_by_id(&self, model: &Path, id: &str) -> Result<Decision, DecisionServiceError> {
        Ok(self.repo.load_by_id(model, id)?)
    }

    pub fn get_by_title(&self, model: &Path, title: &str) -> Result<Decision, DecisionServiceError> {
        Ok(self.repo.load_by_title(model, title)?)
    }

    pub fn resolve(
        &self,
        model: &Path,
        reference: &DecisionRef,
    ) -> Result<Decision, DecisionServiceError> {
        match reference {
            DecisionRef::Id(id) => self.get_by_id(model, id),
            DecisionRef::Title(title) => self.get_by_title(model, title),
        }
    }

    pub fn get_content(
        &self,
        model: &Path,
        id: &str,
    ) -> Result<DecisionContent, DecisionServiceError> {
        Ok(self.repo.load_content(model, id)?)
    }

    /// Appends question, criteria and options, in that order.
    pub fn edit(
        &self,
        model: &Path,
        id: &str,
        edit: &DecisionEdit,
    ) -> Result<(), DecisionServiceError> {
        if let Some(question) = &edit.question {
            self.append_to_section(model, id, Section::Question, question)?;
        }
        if let Some(criteria) = &edit.criteria {
            self.append_to_section(model, id, Section::Criteria, criteria)?;
        }
        if !edit.options.is_empty() {
            self.append_options(model, id, &edit.options)?;
        }
        Ok(())
    }

    /// Appends numbered options; returns the numbers assigned.
    ///
    /// # Errors
    /// - `OptionAlreadyExists` when a label (case-insensitive) or number is
    ///   already present, in the file or earlier in the same batch.
    pub fn append_options<S: AsRef<str>>(
        &self,
        model: &Path,
        id: &str,
        options: &[S],
    ) -> Result<Vec<u32>, DecisionServiceError> {
        let content = self.repo.load_content(model, id)?;
        let mut lines = existing_lines(&content.options);
        let mut next = count_options(&lines) + 1;
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut assigned = Vec::new();

        for option in options.iter().map(|option| option.as_ref().trim()) {
            if option.is_empty() {
                continue;
            }
            let duplicate = !seen.insert(option.to_lowercase())
                || self.repo.option_exists(model, id, option)?;
            if duplicate {
                return Err(DecisionServiceError::OptionAlreadyExists {
                    id: id.to_string(),
                    option: option.to_string(),
                });
            }
            lines.push(option_line(next, option));
            assigned.push(next);
            next += 1;
        }

        if !assigned.is_empty() {
            self.repo.update_section(model, id, Section::Options, &lines)?;
        }
        Ok(assigned)
    }

    /// Links `source` to `target` and saves both.
    ///
    /// Blank tags mean `precedes`/`succeeds`.
    pub fn link(
        &self,
        model: &Path,
        source: &mut Decision,
        target: &mut Decision,
        tag: &str,
        reverse_tag: &str,
    ) -> Result<(), DecisionServiceError> {
        let relation = LinkRelation::from_tags(tag, reverse_tag)?;
        let graph = match relation {
            LinkRelation::Precedence => {
                let mut graph = PrecedenceGraph::from_decisions(&self.repo.load_all(model)?);
                graph.insert(source);
                graph.insert(target);
                graph
            }
            LinkRelation::Custom { .. } => PrecedenceGraph::default(),
        };

        let mut next_source = source.clone();
        let mut next_target = target.clone();
        apply_link(&graph, &mut next_source, &mut next_target, &relation)?;

        self.repo.save(model, &next_source)?;
        *source = next_source;
        self.repo
            .save(model, &next_target)
            .map_err(|err| DecisionServiceError::PartialLink {
                saved_id: source.id.clone(),
                failed_id: target.id.clone(),
                source: err,
            })?;
        *target = next_target;

        info!(
            "event=decision_link module=service status=ok source={} target={}",
            source.id, target.id
        );
        Ok(())
    }

    /// Adds a tag (case-sensitive exact duplicate check) and saves.
    pub fn tag(
        &self,
        model: &Path,
        decision: &mut Decision,
        tag: &str,
    ) -> Result<(), DecisionServiceError> {
        if decision.has_tag(tag) {
            return Err(DecisionServiceError::TagAlreadyExists {
                id: decision.id.clone(),
                tag: tag.to_string(),
            });
        }
        let mut updated = decision.clone();
        updated.tags.push(tag.to_string());
        self.repo.save(model, &updated)?;
        *decision = updated;
        Ok(())
    }

    pub fn filter(
        &self,
        decisions: &[Decision],
        filter: &DecisionFilter,
    ) -> Result<Vec<Decision>, DecisionServiceError> {
        filter.apply(decisions)
    }

    /// Writes the outcome for `option` and marks the decision decided.
    ///
    /// With `force`, a missing non-numeric option is appended first. Returns
    /// the chosen option number. Performs no status guard.
    pub fn decide(
        &self,
        model: &Path,
        decision: &mut Decision,
        option: &str,
        rationale: &str,
        force: bool,
    ) -> Result<u32, DecisionServiceError> {
        let id = decision.id.clone();
        if !self.repo.option_exists(model, &id, option)? {
            if !force {
                return Err(DecisionServiceError::MissingOption {
                    id,
                    option: option.to_string(),
                });
            }
            if option_position(option).is_some() {
                return Err(DecisionServiceError::NumericOptionNotAllowed(
                    option.to_string(),
                ));
            }
            self.append_options(model, &id, &[option])?;
        }

        let number = self.repo.resolve_option_number(model, &id, option)?;
        self.repo
            .append_outcome_section(model, &id, &outcome_text(number, rationale))?;

        decision.status = DecisionStatus::Decided;
        self.repo.save(model, decision)?;

        info!(
            "event=decision_decide module=service status=ok id={} option={}",
            id, number
        );
        Ok(number)
    }

    /// Guarded decide: rejects decided decisions, then records a comment.
    pub fn decide_open(
        &self,
        model: &Path,
        decision: &mut Decision,
        option: &str,
        rationale: &str,
        author: &str,
        force: bool,
    ) -> Result<u32, DecisionServiceError> {
        if decision.is_decided() {
            return Err(DecisionServiceError::AlreadyDecided(decision.id.clone()));
        }
        let number = self.decide(model, decision, option, rationale, force)?;
        self.comment(model, decision, author, DECIDED_COMMENT)?;
        Ok(number)
    }

    /// Creates an open revision of `original` and links the two.
    ///
    /// The revision keeps title (suffixed), tags, question, options and
    /// criteria; outcome and comments start empty.
    pub fn revise(
        &self,
        model: &Path,
        original: &mut Decision,
    ) -> Result<Decision, DecisionServiceError> {
        let mut content = self.repo.load_content(model, &original.id)?;
        content.outcome.clear();
        content.comments.clear();

        let mut revised = Decision::new(format!("{}{REVISED_TITLE_SUFFIX}", original.title));
        revised.tags = original.tags.clone();

        let sub_folder = self.sub_folder(model, &original.id)?;
        let mut revised = self
            .repo
            .create(model, sub_folder.as_deref(), revised, &content)?;
        self.link(model, original, &mut revised, REVISED_BY, REVISES)?;

        info!(
            "event=decision_revise module=service status=ok original={} revised={}",
            original.id, revised.id
        );
        Ok(revised)
    }

    /// Byte-copies one decision file into another model.
    pub fn copy(
        &self,
        source_model: &Path,
        target_model: &Path,
        id: &str,
    ) -> Result<PathBuf, DecisionServiceError> {
        Ok(self.repo.copy(source_model, target_model, id)?)
    }

    /// Records a comment in metadata and appends its anchored line.
    pub fn comment(
        &self,
        model: &Path,
        decision: &mut Decision,
        author: &str,
        text: &str,
    ) -> Result<Comment, DecisionServiceError> {
        let sequence = u32::try_from(decision.comments.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let comment = Comment {
            author: author.to_string(),
            timestamp: chrono::Local::now()
                .format(COMMENT_TIMESTAMP_FORMAT)
                .to_string(),
            sequence,
        };

        let mut updated = decision.clone();
        updated.comments.push(comment.clone());
        self.repo.save(model, &updated)?;
        *decision = updated;
        self.repo
            .append_comment_section(model, &decision.id, &comment, text)?;

        info!(
            "event=decision_comment module=service status=ok id={} sequence={}",
            decision.id, sequence
        );
        Ok(comment)
    }

    fn append_to_section(
        &self,
        model: &Path,
        id: &str,
        section: Section,
        text: &str,
    ) -> Result<(), DecisionServiceError> {
        let content = self.repo.load_content(model, id)?;
        let mut lines = existing_lines(content.get(section));
        lines.extend(text_lines(text));
        self.repo.update_section(model, id, section, &lines)?;
        Ok(())
    }

    /// Folder of the decision file relative to the model root.
    fn sub_folder(
        &self,
        model: &Path,
        id: &str,
    ) -> Result<Option<PathBuf>, DecisionServiceError> {
        let path = self.repo.find_decision_file(model, id)?;
        Ok(path
            .strip_prefix(model)
            .ok()
            .and_then(Path::parent)
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf))
    }
}

fn validate_title(title: &str) -> Result<(), DecisionServiceError> {
    if title.chars().any(char::is_alphabetic) {
        Ok(())
    } else {
        Err(DecisionServiceError::InvalidTitle(title.to_string()))
    }
}

fn existing_lines(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        Vec::new()
    } else {
        text_lines(body)
    }
}
