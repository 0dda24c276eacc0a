//! Loading quest definition files
//!
//! A quest file is YAML (`.yml`/`.yaml`) or TOML (`.toml`) with the layout:
//!
//! ```yaml
//! name: City Hunt
//! description: Find the landmarks
//! start_date: "2026-10-16T18:00:00"
//! duration: 2h30m
//! teams:
//!   - name: Red
//!     description: North side
//!     communication: https://t.me/red
//!     tasks:
//!       - question: Capital of France?
//!         answer: paris
//!         hints: [Eiffel tower]
//! ```
//!
//! Every field is required; `teams` must be non-empty, `tasks` and `hints`
//! may be empty arrays.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::duration::{parse_duration, parse_start_date};
use super::{QuestDefinition, TaskDefinition, TeamDefinition};
use crate::error::DefinitionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestFile {
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub duration: String,
    pub teams: Vec<TeamFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFile {
    pub name: String,
    pub description: String,
    pub communication: String,
    pub tasks: Vec<TaskFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFile {
    pub question: String,
    pub answer: String,
    pub hints: Vec<String>,
}

impl TryFrom<QuestFile> for QuestDefinition {
    type Error = DefinitionError;

    fn try_from(file: QuestFile) -> Result<Self, Self::Error> {
        let start_date = parse_start_date(&file.start_date)
            .ok_or_else(|| DefinitionError::InvalidStartDate(file.start_date.clone()))?;

        let secs = parse_duration(&file.duration)
            .and_then(|secs| i64::try_from(secs).ok())
            .ok_or_else(|| DefinitionError::InvalidDuration(file.duration.clone()))?;
        let duration = TimeDelta::try_seconds(secs)
            .ok_or_else(|| DefinitionError::InvalidDuration(file.duration.clone()))?;

        let teams = file
            .teams
            .into_iter()
            .map(|team| {
                let tasks = team
                    .tasks
                    .into_iter()
                    .map(|task| TaskDefinition::new(task.question, task.answer, task.hints))
                    .collect();
                TeamDefinition::new(team.name, team.description, team.communication, tasks)
            })
            .collect();

        QuestDefinition::new(file.name, file.description, start_date, duration, teams)
    }
}

/// Definition file formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

fn format_of(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "yml" | "yaml" => Some(Format::Yaml),
        "toml" => Some(Format::Toml),
        _ => None,
    }
}

/// Parse definition text. `path` is only used for format detection and errors.
pub fn parse_str(path: &Path, contents: &str) -> Result<QuestDefinition, DefinitionError> {
    let file: QuestFile = match format_of(path) {
        Some(Format::Yaml) => {
            serde_yaml::from_str(contents).map_err(|e| DefinitionError::Yaml {
                path: path.to_path_buf(),
                source: e,
            })?
        }
        Some(Format::Toml) => toml::from_str(contents).map_err(|e| DefinitionError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?,
        None => return Err(DefinitionError::UnsupportedFormat(path.to_path_buf())),
    };

    QuestDefinition::try_from(file)
}

/// Load and validate a single definition file
pub fn load_file(path: &Path) -> Result<QuestDefinition, DefinitionError> {
    let contents = fs::read_to_string(path).map_err(|e| DefinitionError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_str(path, &contents)
}

/// Default user quest directory (`<config dir>/questbot/quests`)
pub fn default_quests_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("questbot").join("quests"))
}

/// List definition files (by extension) directly inside `dir`, sorted by path.
pub fn list_definition_files(dir: &Path) -> Result<Vec<PathBuf>, DefinitionError> {
    let entries = fs::read_dir(dir).map_err(|e| DefinitionError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && format_of(path).is_some())
        .collect();
    files.sort();
    Ok(files)
}

/// Load every valid definition in `dir`.
///
/// Invalid files are logged and skipped; only an unreadable directory is an error.
pub fn load_directory(dir: &Path) -> Result<Vec<QuestDefinition>, DefinitionError> {
    let mut definitions = Vec::new();

    for path in list_definition_files(dir)? {
        match load_file(&path) {
            Ok(def) => {
                tracing::info!(quest = %def.name(), file = ?path.file_name(), "Loaded quest definition");
                definitions.push(def);
            }
            Err(e) => {
                tracing::warn!(file = ?path.file_name(), error = %e, "Skipping invalid quest definition");
            }
        }
    }

    Ok(definitions)
}
