//! Team scoring
//!
//! A [`ScoringEngine`] accumulates one [`TaskRecord`] per completed task:
//! how long the team needed and how many penalty units it collected (wrong
//! answers, granted hints). Appraisal is a pure function of those records,
//! so a final score can always be recomputed and audited from them.
//!
//! Each record is worth three non-negative components:
//! - a fixed completion bonus
//! - `max(0, no_penalty_bonus - penalties * penalty_unit)`
//! - `max(0, time_bonus - floor(time_bonus * elapsed / max_duration))`

use chrono::{NaiveDateTime, TimeDelta};
use questbot_types::ScoringConfig;

/// One completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRecord {
    pub duration: TimeDelta,
    pub penalties: u32,
}

/// Points awarded for a single [`TaskRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskAppraisal {
    pub completion: u32,
    pub no_penalty: u32,
    pub time: u32,
}

impl TaskAppraisal {
    pub fn total(&self) -> u32 {
        self.completion + self.no_penalty + self.time
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.completion, self.no_penalty, self.time]
    }
}

impl TaskRecord {
    pub fn appraise(&self, config: &ScoringConfig) -> TaskAppraisal {
        let penalty_points = u64::from(self.penalties) * u64::from(config.penalty_unit);
        let no_penalty = u64::from(config.no_penalty_bonus).saturating_sub(penalty_points);

        let max_ms = i64::try_from(config.max_task_duration().as_millis()).unwrap_or(i64::MAX);
        let elapsed_ms = self.duration.num_milliseconds().max(0);
        let time = if max_ms == 0 {
            0
        } else {
            let bonus = i64::from(config.time_bonus);
            // Integer division on non-negative operands floors
            let decay = (i128::from(bonus) * i128::from(elapsed_ms) / i128::from(max_ms)) as i64;
            (bonus - decay.min(bonus)).max(0)
        };

        TaskAppraisal {
            completion: config.completion_bonus,
            no_penalty: no_penalty as u32,
            time: time as u32,
        }
    }
}

/// Per-team accumulator. Only one task is open at a time.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    records: Vec<TaskRecord>,
    opened_at: Option<NaiveDateTime>,
    penalties: u32,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            opened_at: None,
            penalties: 0,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Start timing a new task and reset the penalty counter.
    pub fn open(&mut self, now: NaiveDateTime) {
        self.opened_at = Some(now);
        self.penalties = 0;
    }

    pub fn penalize(&mut self, units: u32) {
        self.penalties = self.penalties.saturating_add(units);
    }

    /// Record the open task as completed. Returns `None` if no task was open.
    pub fn close(&mut self, now: NaiveDateTime) -> Option<TaskRecord> {
        let opened_at = self.opened_at.take()?;
        let record = TaskRecord {
            duration: now - opened_at,
            penalties: std::mem::take(&mut self.penalties),
        };
        self.records.push(record);
        Some(record)
    }

    /// Drop the open task without recording it.
    pub fn abandon(&mut self) {
        self.opened_at = None;
        self.penalties = 0;
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    pub fn pending_penalties(&self) -> u32 {
        self.penalties
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Clear everything, used when a team (re)starts.
    pub fn reset(&mut self) {
        self.records.clear();
        self.abandon();
    }

    pub fn appraise(&self) -> Vec<TaskAppraisal> {
        self.records
            .iter()
            .map(|record| record.appraise(&self.config))
            .collect()
    }

    pub fn appraise_total(&self) -> u64 {
        self.appraise().iter().map(|a| u64::from(a.total())).sum()
    }
}
