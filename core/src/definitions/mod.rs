//! Quest definitions
//!
//! Definitions are the immutable templates a quest file describes:
//! a quest owns an ordered list of teams, a team owns an ordered list of tasks.
//! Runtime state (lifecycle, task cursor, hints left) lives in
//! [`crate::events::QuestEvent`] and [`crate::team::TeamCoordinator`], which
//! share the definition through an `Arc`.
//!
//! Construction validates the tree, so a `QuestDefinition` in hand always has
//! a non-blank name, a positive duration and at least one team.

mod duration;
mod loader;

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::DefinitionError;
use crate::validation;

pub use duration::{parse_duration, parse_start_date};
pub use loader::{
    QuestFile, TaskFile, TeamFile, default_quests_dir, list_definition_files, load_directory,
    load_file, parse_str,
};

/// One question with its answer and optional hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub question: String,
    pub answer: String,
    pub hints: Vec<String>,
}

impl TaskDefinition {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, hints: Vec<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            hints,
        }
    }

    /// Case-insensitive comparison against the expected answer.
    pub fn matches(&self, value: &str) -> bool {
        value.to_lowercase() == self.answer.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDefinition {
    pub name: String,
    pub description: String,
    /// Where the team coordinates, usually a group chat link
    pub communication: String,
    pub tasks: Vec<TaskDefinition>,
}

impl TeamDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        communication: impl Into<String>,
        tasks: Vec<TaskDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            communication: communication.into(),
            tasks,
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// A validated quest. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestDefinition {
    name: String,
    description: String,
    start_date: NaiveDateTime,
    duration: TimeDelta,
    teams: Vec<TeamDefinition>,
}

impl QuestDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        start_date: NaiveDateTime,
        duration: TimeDelta,
        teams: Vec<TeamDefinition>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DefinitionError::Invalid("quest name is blank".to_string()));
        }
        if duration <= TimeDelta::zero() {
            return Err(DefinitionError::Invalid(format!(
                "quest {name:?} must have a positive duration"
            )));
        }
        if start_date.checked_add_signed(duration).is_none() {
            return Err(DefinitionError::Invalid(format!(
                "quest {name:?} ends past the representable date range"
            )));
        }
        if teams.is_empty() {
            return Err(DefinitionError::Invalid(format!(
                "quest {name:?} has no teams"
            )));
        }
        if teams.iter().any(|t| t.name.trim().is_empty()) {
            return Err(DefinitionError::Invalid(format!(
                "quest {name:?} has a team with a blank name"
            )));
        }
        for team in &teams {
            if team.tasks.iter().any(|task| task.answer.trim().is_empty()) {
                return Err(DefinitionError::Invalid(format!(
                    "team {:?} of quest {name:?} has a task with a blank answer",
                    team.name
                )));
            }
        }

        Ok(Self {
            name,
            description: description.into(),
            start_date,
            duration,
            teams,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Checked against overflow at construction.
    pub fn end_date(&self) -> NaiveDateTime {
        self.start_date
            .checked_add_signed(self.duration)
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn teams(&self) -> &[TeamDefinition] {
        &self.teams
    }

    pub fn task_count(&self) -> usize {
        self.teams.iter().map(TeamDefinition::task_count).sum()
    }

    /// Non-fatal problems worth reporting before a quest goes live.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut names: Vec<&str> = self.teams.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                warnings.push(format!("duplicate team name {:?}", pair[0]));
            }
        }

        for team in &self.teams {
            if team.tasks.is_empty() {
                warnings.push(format!("team {:?} has no tasks", team.name));
            }
            for (idx, task) in team.tasks.iter().enumerate() {
                if !validation::is_valid_answer(&task.answer) {
                    warnings.push(format!(
                        "team {:?} task {}: answer {:?} cannot be typed through the answer command",
                        team.name,
                        idx + 1,
                        task.answer
                    ));
                }
            }
        }

        warnings
    }
}
