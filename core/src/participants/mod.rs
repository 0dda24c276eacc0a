//! Participants and their registry
//!
//! A participant holds at most one [`TeamRef`]: a back-reference (quest name +
//! team index) into the team it plays for. The team itself is owned by its
//! [`crate::events::QuestEvent`].

mod storage;

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;

use crate::notify::{ChatId, Recipient};

pub use storage::{ParticipantRecord, ParticipantStore, default_data_dir};

pub type ParticipantId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticipantState {
    #[default]
    Idle,
    Playing,
    Deleted,
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParticipantState::Idle => "IDLE",
            ParticipantState::Playing => "PLAYING",
            ParticipantState::Deleted => "DELETED",
        };
        f.pad(s)
    }
}

/// Which team of which quest a participant plays for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TeamRef {
    pub quest: String,
    pub team: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub chat_id: ChatId,
    pub name: String,
    pub locale: String,
    pub state: ParticipantState,
    pub team: Option<TeamRef>,
}

impl Participant {
    pub fn new(id: ParticipantId, chat_id: ChatId, name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            id,
            chat_id,
            name: name.into(),
            locale: locale.into(),
            state: ParticipantState::Idle,
            team: None,
        }
    }

    pub fn recipient(&self) -> Recipient {
        Recipient {
            participant_id: self.id,
            chat_id: self.chat_id,
            locale: self.locale.clone(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.team.is_some()
    }

    /// Attach to a team and mark as playing.
    pub fn assign(&mut self, team: TeamRef) {
        self.team = Some(team);
        self.state = ParticipantState::Playing;
    }

    /// Drop the team reference, returning it.
    pub fn detach(&mut self) -> Option<TeamRef> {
        let team = self.team.take();
        if self.state == ParticipantState::Playing {
            self.state = ParticipantState::Idle;
        }
        team
    }
}

/// Nickname handed out when the front end does not supply a username.
pub fn generated_nickname() -> String {
    format!("player_{:04}", rand::thread_rng().gen_range(0..10_000))
}

/// All known participants keyed by id.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new participant. Returns `false` and leaves the registry
    /// unchanged if the id is already known.
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.participants.contains_key(&participant.id) {
            return false;
        }
        self.participants.insert(participant.id, participant);
        true
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    /// Remove a participant, marking the returned value as deleted.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let mut participant = self.participants.remove(&id)?;
        participant.team = None;
        participant.state = ParticipantState::Deleted;
        Some(participant)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants currently attached to any team of `quest`.
    pub fn members_of<'a>(&'a self, quest: &'a str) -> impl Iterator<Item = &'a Participant> + 'a {
        self.participants
            .values()
            .filter(move |p| p.team.as_ref().is_some_and(|t| t.quest == quest))
    }

    pub fn records(&self) -> Vec<ParticipantRecord> {
        self.participants.values().map(ParticipantRecord::from).collect()
    }
}
