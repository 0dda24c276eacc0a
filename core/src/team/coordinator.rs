//! Per-team task engine.
//!
//! The coordinator walks one team through its ordered tasks:
//! - NotStarted: before `start()`
//! - Task(k): question k is open, its hints are queued
//! - Exhausted: every task answered, the team is no longer running
//!
//! All announcements go to the team's own [`NotificationHub`].

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDateTime;
use questbot_types::ScoringConfig;
use questbot_types::formatting::format_elapsed;

use crate::definitions::{QuestDefinition, TaskDefinition, TeamDefinition};
use crate::notify::{NotificationHub, Notifier, Recipient};
use crate::participants::ParticipantId;
use crate::scoring::ScoringEngine;

/// Position of the team in its task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskCursor {
    #[default]
    NotStarted,
    Task(usize),
    Exhausted,
}

/// Result of an answer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Wrong,
    /// The team has no open task (not started, stopped or exhausted)
    NotAllowed,
}

/// Result of a hint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Given { hint: String, remaining: usize },
    Exhausted,
    NotAllowed,
}

#[derive(Debug, Clone)]
pub struct TeamCoordinator {
    quest: Arc<QuestDefinition>,
    team_index: usize,
    cursor: TaskCursor,
    hints: VecDeque<String>,
    running: bool,
    hub: NotificationHub,
    scoring: ScoringEngine,
}

impl TeamCoordinator {
    /// Coordinator for `quest.teams()[team_index]`.
    pub fn new(
        quest: Arc<QuestDefinition>,
        team_index: usize,
        notifier: Notifier,
        scoring: ScoringConfig,
    ) -> Self {
        assert!(
            team_index < quest.teams().len(),
            "team index {team_index} out of range for quest {:?}",
            quest.name()
        );
        let label = format!("{}/{}", quest.name(), quest.teams()[team_index].name);

        Self {
            quest,
            team_index,
            cursor: TaskCursor::NotStarted,
            hints: VecDeque::new(),
            running: false,
            hub: NotificationHub::new(label, notifier),
            scoring: ScoringEngine::new(scoring),
        }
    }

    pub fn team(&self) -> &TeamDefinition {
        &self.quest.teams()[self.team_index]
    }

    pub fn name(&self) -> &str {
        &self.team().name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn cursor(&self) -> TaskCursor {
        self.cursor
    }

    /// `-1` before start, `task_count` once exhausted.
    pub fn task_index(&self) -> i64 {
        match self.cursor {
            TaskCursor::NotStarted => -1,
            TaskCursor::Task(k) => k as i64,
            TaskCursor::Exhausted => self.team().task_count() as i64,
        }
    }

    pub fn current_task(&self) -> Option<&TaskDefinition> {
        match self.cursor {
            TaskCursor::Task(k) => self.team().tasks.get(k),
            _ => None,
        }
    }

    pub fn hints_left(&self) -> usize {
        self.hints.len()
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn score(&self) -> u64 {
        self.scoring.appraise_total()
    }

    pub fn tasks_done(&self) -> usize {
        self.scoring.records().len()
    }

    // --- Membership ---

    pub fn subscribe(&mut self, recipient: Recipient) -> bool {
        self.hub.subscribe(recipient)
    }

    pub fn unsubscribe(&mut self, participant_id: ParticipantId) -> bool {
        self.hub.unsubscribe(participant_id)
    }

    // --- Lifecycle ---

    /// Begin the quest for this team and announce the first task.
    pub fn start(&mut self, now: NaiveDateTime) {
        tracing::info!(team = %self.hub.label(), "Team has started the quest");

        self.running = true;
        self.cursor = TaskCursor::NotStarted;
        self.hints.clear();
        self.scoring.reset();

        let team = self.team();
        let vars = [
            ("team_name", team.name.clone()),
            ("team_description", team.description.clone()),
            ("team_communication", team.communication.clone()),
        ];
        self.hub.broadcast_template("quest_started_info", &vars);

        self.advance(now);
    }

    /// Move to the next task. Returns `false` once no tasks are left.
    pub fn advance(&mut self, now: NaiveDateTime) -> bool {
        let next = match self.cursor {
            TaskCursor::NotStarted => 0,
            TaskCursor::Task(k) => k + 1,
            TaskCursor::Exhausted => return false,
        };

        if next >= self.team().task_count() {
            tracing::info!(team = %self.hub.label(), "Team has completed all tasks");
            self.cursor = TaskCursor::Exhausted;
            self.hints.clear();
            self.running = false;
            self.scoring.abandon();
            self.hub.broadcast_template("quest_no_tasks_left", &[]);
            return false;
        }

        self.cursor = TaskCursor::Task(next);
        let task = &self.quest.teams()[self.team_index].tasks[next];
        self.hints = task.hints.iter().cloned().collect();
        self.scoring.open(now);

        tracing::info!(team = %self.hub.label(), task = next + 1, "Team has started task");
        let vars = [
            ("task_number", (next + 1).to_string()),
            ("task_question", task.question.clone()),
        ];
        self.hub.broadcast_template("quest_new_task", &vars);
        true
    }

    /// Hand out the next queued hint to the whole team.
    pub fn give_hint(&mut self, username: &str) -> HintOutcome {
        if !self.running {
            tracing::debug!(team = %self.hub.label(), "Hint requested while team is not running");
            return HintOutcome::NotAllowed;
        }

        let Some(hint) = self.hints.pop_front() else {
            tracing::info!(team = %self.hub.label(), user = username, "Hint requested, none left");
            self.hub
                .broadcast_template("get_hint_empty", &[("username", username.to_string())]);
            return HintOutcome::Exhausted;
        };

        let remaining = self.hints.len();
        self.scoring.penalize(self.scoring.config().hint_penalty);
        tracing::info!(
            team = %self.hub.label(),
            user = username,
            task = self.task_index() + 1,
            remaining,
            "Hint given"
        );

        let vars = [
            ("username", username.to_string()),
            ("task_hint", hint.clone()),
            ("hints_left", remaining.to_string()),
        ];
        self.hub.broadcast_template("get_hint_success", &vars);
        HintOutcome::Given { hint, remaining }
    }

    /// Check `value` against the open task, advancing on a match.
    pub fn check_answer(&mut self, username: &str, value: &str, now: NaiveDateTime) -> AnswerOutcome {
        if !self.running {
            tracing::debug!(team = %self.hub.label(), "Answer sent while team is not running");
            return AnswerOutcome::NotAllowed;
        }
        let Some(task) = self.current_task() else {
            return AnswerOutcome::NotAllowed;
        };

        let vars = [
            ("username", username.to_string()),
            ("answer", value.to_string()),
        ];

        if task.matches(value) {
            let elapsed = self
                .scoring
                .close(now)
                .map(|record| format_elapsed(record.duration.num_seconds().max(0) as u64))
                .unwrap_or_default();
            tracing::info!(
                team = %self.hub.label(),
                user = username,
                task = self.task_index() + 1,
                elapsed = %elapsed,
                "Correct answer"
            );
            self.hub.broadcast_template("quest_correct_answer", &vars);
            self.advance(now);
            AnswerOutcome::Correct
        } else {
            tracing::info!(
                team = %self.hub.label(),
                user = username,
                answer = value,
                task = self.task_index() + 1,
                "Wrong answer"
            );
            self.hub.broadcast_template("quest_wrong_answer", &vars);
            self.scoring.penalize(self.scoring.config().wrong_answer_penalty);
            AnswerOutcome::Wrong
        }
    }

    /// Stop the team, announce it and drop every subscriber.
    /// Returns the participants that were subscribed.
    pub fn stop(&mut self) -> Vec<ParticipantId> {
        tracing::info!(team = %self.hub.label(), "Team has stopped the quest");
        self.running = false;
        self.hints.clear();
        self.scoring.abandon();
        self.hub.broadcast_template("quest_stopped", &[]);
        self.hub.clear()
    }

    /// Announce the team's final score on its own channel.
    pub fn publish_score(&self) {
        let vars = [
            ("team_name", self.name().to_string()),
            ("tasks_done", self.tasks_done().to_string()),
            ("task_count", self.team().task_count().to_string()),
            ("score", questbot_types::formatting::format_points(self.score(), false)),
        ];
        self.hub.broadcast_template("quest_team_score", &vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::fixtures::{quest, task, team};
    use crate::notify::testing::{RecordingMessenger, notifier, recipient};
    use chrono::{Local, TimeDelta};

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn coordinator(tasks: Vec<TaskDefinition>) -> (TeamCoordinator, RecordingMessenger) {
        let q = Arc::new(quest("q", now(), 60, vec![team("red", tasks)]));
        let (notifier, messenger) = notifier();
        let mut tc = TeamCoordinator::new(q, 0, notifier, ScoringConfig::default());
        tc.subscribe(recipient(1, "en"));
        (tc, messenger)
    }

    fn three_tasks() -> Vec<TaskDefinition> {
        vec![
            task("Capital of France?", "paris", &["Eiffel", "Seine"]),
            task("2+2?", "4", &[]),
            task("Largest ocean?", "Pacific", &["Big"]),
        ]
    }

    #[test]
    fn test_start_announces_team_and_first_task() {
        let (mut tc, messenger) = coordinator(three_tasks());
        assert_eq!(tc.task_index(), -1);
        assert!(!tc.is_running());

        tc.start(now());

        assert!(tc.is_running());
        assert_eq!(tc.task_index(), 0);
        assert_eq!(tc.hints_left(), 2);
        let texts = messenger.texts_for(1);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Team red"));
        assert!(texts[0].contains("https://chat/red"));
        assert_eq!(texts[1], "New task #1:\nCapital of France?");
    }

    #[test]
    fn test_n_advances_exhaust_n_tasks() {
        let (mut tc, messenger) = coordinator(three_tasks());
        let t = now();
        tc.start(t);

        assert!(tc.advance(t));
        assert!(tc.advance(t));
        assert_eq!(tc.task_index(), 2);
        assert!(!tc.advance(t));
        assert_eq!(tc.task_index(), 3);
        assert_eq!(tc.cursor(), TaskCursor::Exhausted);
        assert!(!tc.is_running());
        assert_eq!(tc.hints_left(), 0);
        assert_eq!(
            messenger.texts_for(1).last().unwrap(),
            "You have completed all tasks!"
        );

        // Further advances keep the index in range
        assert!(!tc.advance(t));
        assert_eq!(tc.task_index(), 3);
    }

    #[test]
    fn test_team_without_tasks_is_exhausted_on_start() {
        let (mut tc, _) = coordinator(vec![]);
        tc.start(now());
        assert_eq!(tc.task_index(), 0);
        assert_eq!(tc.cursor(), TaskCursor::Exhausted);
        assert!(!tc.is_running());
    }

    #[test]
    fn test_not_allowed_before_start_and_after_exhaustion() {
        let (mut tc, messenger) = coordinator(vec![task("2+2?", "4", &["four"])]);
        assert_eq!(tc.check_answer("bob", "4", now()), AnswerOutcome::NotAllowed);
        assert_eq!(tc.give_hint("bob"), HintOutcome::NotAllowed);
        assert!(messenger.messages().is_empty());

        tc.start(now());
        assert_eq!(tc.check_answer("bob", "4", now()), AnswerOutcome::Correct);
        assert_eq!(tc.task_index(), 1);
        assert_eq!(tc.check_answer("bob", "4", now()), AnswerOutcome::NotAllowed);
        assert_eq!(tc.give_hint("bob"), HintOutcome::NotAllowed);
    }

    #[test]
    fn test_answer_is_case_insensitive() {
        for value in ["PARIS", "paris", "Paris"] {
            let (mut tc, _) = coordinator(three_tasks());
            tc.start(now());
            assert_eq!(tc.check_answer("bob", value, now()), AnswerOutcome::Correct);
            assert_eq!(tc.task_index(), 1);
        }

        let (mut tc, _) = coordinator(three_tasks());
        tc.start(now());
        assert_eq!(tc.check_answer("bob", "lyon", now()), AnswerOutcome::Wrong);
        assert_eq!(tc.task_index(), 0);
        assert_eq!(tc.hints_left(), 2);
    }

    #[test]
    fn test_answers_are_broadcast_team_wide() {
        let (mut tc, messenger) = coordinator(three_tasks());
        tc.subscribe(recipient(2, "en"));
        tc.start(now());
        messenger.clear();

        tc.check_answer("bob", "lyon", now());
        assert_eq!(messenger.texts_for(2), vec!["bob sent a wrong answer: lyon"]);

        tc.check_answer("bob", "Paris", now());
        let texts = messenger.texts_for(1);
        assert_eq!(texts[1], "bob sent the correct answer: Paris");
        assert_eq!(texts[2], "New task #2:\n2+2?");
    }

    #[test]
    fn test_hints_pop_in_order_then_run_out() {
        let (mut tc, messenger) = coordinator(three_tasks());
        tc.start(now());
        messenger.clear();

        assert_eq!(
            tc.give_hint("amy"),
            HintOutcome::Given {
                hint: "Eiffel".to_string(),
                remaining: 1
            }
        );
        assert_eq!(
            tc.give_hint("amy"),
            HintOutcome::Given {
                hint: "Seine".to_string(),
                remaining: 0
            }
        );
        assert_eq!(tc.give_hint("amy"), HintOutcome::Exhausted);

        let texts = messenger.texts_for(1);
        assert_eq!(texts[0], "amy asked for a hint (1 left):\nEiffel");
        assert_eq!(texts[2], "amy asked for a hint, but there are no hints left.");
    }

    #[test]
    fn test_hint_queue_reloads_for_each_task() {
        let (mut tc, _) = coordinator(three_tasks());
        tc.start(now());
        tc.check_answer("bob", "paris", now());
        assert_eq!(tc.hints_left(), 0);
        tc.check_answer("bob", "4", now());
        assert_eq!(tc.hints_left(), 1);
    }

    #[test]
    fn test_penalties_flow_into_score() {
        let (mut tc, _) = coordinator(vec![task("Capital of France?", "paris", &["Eiffel"])]);
        let t0 = now();
        tc.start(t0);
        tc.give_hint("bob");
        tc.give_hint("bob"); // no hint left, no penalty
        tc.check_answer("bob", "rome", t0);
        tc.check_answer("bob", "paris", t0 + TimeDelta::minutes(30));

        assert_eq!(tc.tasks_done(), 1);
        assert_eq!(tc.scoring().records()[0].penalties, 2);
        assert_eq!(tc.score(), 2500);
    }

    #[test]
    fn test_stop_clears_subscribers() {
        let (mut tc, messenger) = coordinator(three_tasks());
        tc.subscribe(recipient(2, "ru"));
        tc.start(now());
        messenger.clear();

        assert_eq!(tc.stop(), vec![1, 2]);
        assert!(!tc.is_running());
        assert!(tc.hub().is_empty());
        assert_eq!(messenger.messages().len(), 2);
        assert_eq!(tc.give_hint("bob"), HintOutcome::NotAllowed);
    }

    #[test]
    fn test_restart_resets_progress() {
        let (mut tc, _) = coordinator(three_tasks());
        tc.start(now());
        tc.check_answer("bob", "paris", now());
        tc.start(now());
        assert_eq!(tc.task_index(), 0);
        assert_eq!(tc.tasks_done(), 0);
    }
}
