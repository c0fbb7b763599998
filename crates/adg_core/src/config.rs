//! Template and author configuration.
//!
//! # Responsibility
//! - Provide the five section header labels used when composing documents.
//! - Provide the default author and default model path.
//! - Read/write the YAML config file, honoring a `custom_config_path` redirect.
//!
//! # Invariants
//! - Missing config file means defaults, never an error.
//! - Blank header values fall back to the built-in labels.
//! - Saving never drops keys this module does not know about.

use crate::model::section::Section;
use log::info;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".adgconfig.yaml";
const REDIRECT_KEY: &str = "custom_config_path";
const HEADER_KEYS: [&str; 5] = [
    "question_header",
    "criteria_header",
    "options_header",
    "comments_header",
    "outcome_header",
];

/// Errors from config file access.
#[derive(Debug)]
pub enum ConfigError {
    /// No home directory to resolve the default config path.
    HomeDirUnavailable,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeDirUnavailable => write!(f, "could not determine home directory"),
            Self::Io { path, source } => write!(f, "config io error at `{}`: {source}", path.display()),
            Self::Yaml { path, source } => {
                write!(f, "invalid config yaml at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HomeDirUnavailable => None,
            Self::Io { source, .. } => Some(source),
            Self::Yaml { source, .. } => Some(source),
        }
    }
}

/// Settings injected into document composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub question_header: String,
    pub options_header: String,
    pub criteria_header: String,
    pub outcome_header: String,
    pub comments_header: String,
    /// Author recorded on comments when the caller gives none.
    pub author: String,
    /// Model directory used when the caller gives none.
    pub default_model: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            question_header: default_header(Section::Question).to_string(),
            options_header: default_header(Section::Options).to_string(),
            criteria_header: default_header(Section::Criteria).to_string(),
            outcome_header: default_header(Section::Outcome).to_string(),
            comments_header: default_header(Section::Comments).to_string(),
            author: String::new(),
            default_model: String::new(),
        }
    }
}

impl DocumentConfig {
    /// Header label for one section, falling back to the built-in label.
    pub fn header_for(&self, section: Section) -> &str {
        let configured = match section {
            Section::Question => &self.question_header,
            Section::Options => &self.options_header,
            Section::Criteria => &self.criteria_header,
            Section::Outcome => &self.outcome_header,
            Section::Comments => &self.comments_header,
        };
        if configured.trim().is_empty() {
            default_header(section)
        } else {
            configured.as_str()
        }
    }

    /// Default model directory, if configured.
    pub fn default_model_path(&self) -> Option<PathBuf> {
        let trimmed = self.default_model.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Loads settings from `path`; a missing or empty file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match read_mapping(path)? {
            Some(mapping) => serde_yaml::from_value(Value::Mapping(mapping)).map_err(|source| {
                ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                }
            }),
            None => Ok(Self::default()),
        }
    }

    /// Loads settings from the active config file.
    pub fn load_active() -> Result<Self, ConfigError> {
        Self::load_from(&active_config_path()?)
    }

    /// Writes non-blank settings into `path`, keeping unrelated keys.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut mapping = read_mapping(path)?.unwrap_or_default();
        let fields = [
            ("question_header", &self.question_header),
            ("criteria_header", &self.criteria_header),
            ("options_header", &self.options_header),
            ("comments_header", &self.comments_header),
            ("outcome_header", &self.outcome_header),
            ("author", &self.author),
            ("default_model", &self.default_model),
        ];
        for (key, value) in fields {
            if !value.trim().is_empty() {
                mapping.insert(Value::from(key), Value::from(value.as_str()));
            }
        }
        write_mapping(path, &mapping)?;
        info!(
            "event=config_save module=config status=ok path={}",
            path.display()
        );
        Ok(())
    }
}

/// Built-in header label of a section.
pub fn default_header(section: Section) -> &'static str {
    match section {
        Section::Question => "Question",
        Section::Options => "Options",
        Section::Criteria => "Criteria",
        Section::Outcome => "Outcome",
        Section::Comments => "Comments",
    }
}

/// `~/.adgconfig.yaml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::HomeDirUnavailable)
}

/// Config file in effect: the redirect target when set, else the default.
pub fn active_config_path() -> Result<PathBuf, ConfigError> {
    let default_path = default_config_path()?;
    resolve_redirect(&default_path)
}

/// Follows the `custom_config_path` key stored in `default_path`.
pub fn resolve_redirect(default_path: &Path) -> Result<PathBuf, ConfigError> {
    let redirect = read_mapping(default_path)?.and_then(|mapping| {
        mapping
            .get(REDIRECT_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    Ok(redirect.unwrap_or_else(|| default_path.to_path_buf()))
}

/// Points `default_path` at another config file.
pub fn set_redirect(default_path: &Path, custom_path: &Path) -> Result<(), ConfigError> {
    let mut mapping = read_mapping(default_path)?.unwrap_or_default();
    mapping.insert(
        Value::from(REDIRECT_KEY),
        Value::from(custom_path.to_string_lossy().into_owned()),
    );
    write_mapping(default_path, &mapping)
}

/// Removes the five header keys from `path`, keeping author/model.
pub fn reset_headers(path: &Path) -> Result<(), ConfigError> {
    let Some(mut mapping) = read_mapping(path)? else {
        return Ok(());
    };
    for key in HEADER_KEYS {
        mapping.remove(key);
    }
    write_mapping(path, &mapping)
}

fn read_mapping(path: &Path) -> Result<Option<Mapping>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match value {
        Value::Mapping(mapping) => Some(mapping),
        _ => None,
    })
}

fn write_mapping(path: &Path, mapping: &Mapping) -> Result<(), ConfigError> {
    let text = serde_yaml::to_string(mapping).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
