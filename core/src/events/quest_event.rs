use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use questbot_types::ScoringConfig;
use questbot_types::formatting::format_points;
use rand::seq::SliceRandom;

use crate::definitions::QuestDefinition;
use crate::error::EngineError;
use crate::notify::Notifier;
use crate::participants::{Participant, ParticipantId, TeamRef};
use crate::team::TeamCoordinator;

use super::state::EventState;

/// Annotation key under which the published identifier is stored.
pub const EVENT_ID_KEY: &str = "event_id";

/// Runtime wrapper around one quest definition.
///
/// Owns the team coordinators and the round-robin cursor used to assign
/// joining participants. Callers serialize access (the registry keeps every
/// event behind its own mutex).
#[derive(Debug)]
pub struct QuestEvent {
    definition: Arc<QuestDefinition>,
    state: EventState,
    annotations: HashMap<String, String>,
    teams: Vec<TeamCoordinator>,
    cursor: usize,
}

impl QuestEvent {
    pub fn new(
        definition: Arc<QuestDefinition>,
        notifier: Notifier,
        scoring: ScoringConfig,
        shuffle_teams: bool,
    ) -> Self {
        let mut teams: Vec<_> = (0..definition.teams().len())
            .map(|idx| {
                TeamCoordinator::new(
                    Arc::clone(&definition),
                    idx,
                    notifier.clone(),
                    scoring.clone(),
                )
            })
            .collect();

        if shuffle_teams {
            teams.shuffle(&mut rand::thread_rng());
        }

        Self {
            definition,
            state: EventState::Unknown,
            annotations: HashMap::new(),
            teams,
            cursor: 0,
        }
    }

    pub fn definition(&self) -> &Arc<QuestDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    /// Move the lifecycle forward. Moving backward is rejected and leaves
    /// the stored state untouched; setting the current state is a no-op.
    pub fn set_state(&mut self, next: EventState) -> Result<EventState, EngineError> {
        let previous = self.state;
        if next < previous {
            return Err(EngineError::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        self.state = next;
        Ok(previous)
    }

    // --- Annotations ---

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn remove_annotation(&mut self, key: &str) -> Option<String> {
        self.annotations.remove(key)
    }

    /// Published identifier, present only while registration is open.
    pub fn event_id(&self) -> Option<&str> {
        self.annotation(EVENT_ID_KEY)
    }

    // --- Teams ---

    pub fn teams(&self) -> &[TeamCoordinator] {
        &self.teams
    }

    pub fn team(&self, idx: usize) -> Option<&TeamCoordinator> {
        self.teams.get(idx)
    }

    pub fn team_mut(&mut self, idx: usize) -> Option<&mut TeamCoordinator> {
        self.teams.get_mut(idx)
    }

    fn next_team_index(&mut self) -> usize {
        // QuestDefinition::new rejects quests without teams
        debug_assert!(!self.teams.is_empty());
        let idx = self.cursor % self.teams.len();
        self.cursor = (idx + 1) % self.teams.len();
        idx
    }

    /// Next team in round-robin order, cycling forever.
    pub fn next_team(&mut self) -> &mut TeamCoordinator {
        let idx = self.next_team_index();
        &mut self.teams[idx]
    }

    /// Assign `participant` to the next team and subscribe them to its channel.
    pub fn join(&mut self, participant: &mut Participant) -> TeamRef {
        let idx = self.next_team_index();
        let team = &mut self.teams[idx];
        team.subscribe(participant.recipient());
        team.hub()
            .broadcast_template("team_member_joined", &[("username", participant.name.clone())]);

        tracing::info!(
            quest = %self.definition.name(),
            team = %team.name(),
            participant = participant.id,
            "Participant joined team"
        );

        let team_ref = TeamRef {
            quest: self.definition.name().to_string(),
            team: idx,
        };
        participant.assign(team_ref.clone());
        team_ref
    }

    /// Detach `participant` from its team in this event.
    /// Returns `false` if they were not playing here.
    pub fn leave(&mut self, participant: &mut Participant) -> bool {
        let Some(team_ref) = participant.team.as_ref().filter(|t| t.quest == self.name()) else {
            return false;
        };
        let idx = team_ref.team;
        if let Some(team) = self.teams.get_mut(idx) {
            team.unsubscribe(participant.id);
            tracing::info!(
                quest = %self.definition.name(),
                team = %team.name(),
                participant = participant.id,
                "Participant left team"
            );
        }
        participant.detach();
        true
    }

    /// Start every team on its first task.
    pub fn start_teams(&mut self, now: NaiveDateTime) {
        for team in &mut self.teams {
            team.start(now);
        }
    }

    /// Publish each team's score on its channel and stop it.
    /// Returns every participant that was subscribed to a team.
    pub fn finish_teams(&mut self) -> Vec<ParticipantId> {
        let mut members = Vec::new();
        for team in &mut self.teams {
            team.publish_score();
            members.extend(team.stop());
        }
        members
    }

    /// `(team name, score)` sorted by score, best first; ties by name.
    pub fn standings(&self) -> Vec<(String, u64)> {
        let mut standings: Vec<_> = self
            .teams
            .iter()
            .map(|t| (t.name().to_string(), t.score()))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings
    }

    /// Standings rendered one team per line.
    pub fn leaderboard(&self) -> String {
        self.standings()
            .iter()
            .enumerate()
            .map(|(pos, (name, score))| format!("{}. {} - {}", pos + 1, name, format_points(*score, false)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Team list shown in the "scheduled" announcement.
    pub fn team_summary(&self) -> String {
        self.teams
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.team().description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
