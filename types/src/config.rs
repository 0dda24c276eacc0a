//! Engine configuration.
//!
//! Every field has a default so a partially written (or missing) config file
//! still yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration consumed by the quest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between two scheduler ticks
    pub tick_interval_secs: u64,

    /// How long before `start_date` a quest opens for registration
    pub registration_window_minutes: u64,

    /// Width of the short public event identifier (digits)
    pub event_id_digits: u32,

    /// Random draws attempted before identifier allocation gives up
    pub event_id_attempts: u32,

    /// Shuffle the team order once when a quest is registered
    pub shuffle_teams: bool,

    /// Locale used when a participant's own locale has no template
    pub default_locale: String,

    /// Directory scanned for quest definition files at startup
    pub quests_dir: PathBuf,

    /// JSON file holding the participant records
    pub participants_path: PathBuf,

    /// Optional TOML file overriding the builtin message templates
    pub templates_path: Option<PathBuf>,

    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            registration_window_minutes: 30,
            event_id_digits: 4,
            event_id_attempts: 10,
            shuffle_teams: true,
            default_locale: "en".to_string(),
            quests_dir: PathBuf::from("quests"),
            participants_path: PathBuf::from("participants.json"),
            templates_path: None,
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        // A zero interval would turn the scheduler into a busy loop
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn registration_window(&self) -> Duration {
        Duration::from_secs(self.registration_window_minutes.saturating_mul(60))
    }
}

/// Point values used to appraise completed tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points deducted from the no-penalty bonus per penalty unit
    pub penalty_unit: u32,
    pub no_penalty_bonus: u32,
    pub time_bonus: u32,
    pub completion_bonus: u32,

    /// Elapsed time at which the time bonus has fully decayed
    pub max_task_minutes: u64,

    /// Penalty units charged for a granted hint
    pub hint_penalty: u32,

    /// Penalty units charged for a wrong answer
    pub wrong_answer_penalty: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            penalty_unit: 250,
            no_penalty_bonus: 2000,
            time_bonus: 2000,
            completion_bonus: 1000,
            max_task_minutes: 30,
            hint_penalty: 1,
            wrong_answer_penalty: 1,
        }
    }
}

impl ScoringConfig {
    pub fn max_task_duration(&self) -> Duration {
        Duration::from_secs(self.max_task_minutes.saturating_mul(60))
    }
}
