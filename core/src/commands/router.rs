use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use questbot_types::formatting::format_duration_compact;
use tokio::sync::Mutex;

use crate::error::CommandError;
use crate::events::{EventState, QuestEvent};
use crate::notify::Recipient;
use crate::participants::{Participant, TeamRef, generated_nickname};
use crate::scheduler::DATE_FORMAT;
use crate::state::SharedState;
use crate::team::{AnswerOutcome, HintOutcome};
use crate::validation::{self, EventIdPattern};

use super::{Command, Sender};

type Vars = Vec<(&'static str, String)>;

/// Applies participant commands to the shared state.
#[derive(Clone)]
pub struct CommandRouter {
    state: Arc<SharedState>,
    event_id_pattern: EventIdPattern,
}

impl CommandRouter {
    pub fn new(state: Arc<SharedState>) -> Self {
        let event_id_pattern = EventIdPattern::new(state.config.event_id_digits);
        Self {
            state,
            event_id_pattern,
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub async fn handle(&self, sender: &Sender, command: Command) -> Result<(), CommandError> {
        self.handle_at(sender, command, Local::now().naive_local()).await
    }

    /// Execute `command` and reply to the sender. On failure the matching
    /// failure template is sent and the error returned.
    pub async fn handle_at(
        &self,
        sender: &Sender,
        command: Command,
        now: NaiveDateTime,
    ) -> Result<(), CommandError> {
        tracing::debug!(participant = sender.participant_id, command = command.name(), "Command received");

        let result = match &command {
            Command::Start => self.start(sender).await,
            Command::Help => Ok(Some(("help", Vec::new()))),
            Command::Register(id) => self.register(sender, id).await,
            Command::Unregister => self.unregister(sender).await,
            Command::Answer(value) => self.answer(sender, value, now).await,
            Command::Hint => self.hint(sender).await,
            Command::Nickname(name) => self.nickname(sender, name).await,
            Command::DeleteMe => self.delete(sender).await,
            Command::AboutMe => self.about_me(sender).await,
            Command::AboutTeam => self.about_team(sender).await,
            Command::AboutQuest => self.about_quest(sender).await,
        };

        match result {
            Ok(Some((template, vars))) => {
                let recipient = self.recipient(sender).await;
                self.state.notifier.send_template(&recipient, template, &vars);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::info!(
                    participant = sender.participant_id,
                    command = command.name(),
                    error = %e,
                    "Command rejected"
                );
                let recipient = self.recipient(sender).await;
                self.state
                    .notifier
                    .send_template(&recipient, command.failure_template(&e), &[]);
                Err(e)
            }
        }
    }

    /// Reply target: the stored participant, or the raw sender if unknown.
    async fn recipient(&self, sender: &Sender) -> Recipient {
        if let Some(p) = self.state.participants.read().await.get(sender.participant_id) {
            return p.recipient();
        }
        Recipient {
            participant_id: sender.participant_id,
            chat_id: sender.chat_id,
            locale: self.locale_of(sender),
        }
    }

    fn locale_of(&self, sender: &Sender) -> String {
        sender
            .locale
            .clone()
            .unwrap_or_else(|| self.state.config.default_locale.clone())
    }

    async fn event_for(&self, team: &TeamRef) -> Result<Arc<Mutex<QuestEvent>>, CommandError> {
        self.state
            .quest(&team.quest)
            .await
            .ok_or_else(|| CommandError::UnknownEvent(team.quest.clone()))
    }

    // --- Commands ---

    async fn start(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let mut participants = self.state.participants.write().await;
        if let Some(existing) = participants.get(sender.participant_id) {
            return Ok(Some(("hello", vec![("name", existing.name.clone())])));
        }

        let name = sender
            .username
            .clone()
            .filter(|u| validation::is_valid_nickname(u))
            .unwrap_or_else(generated_nickname);
        let participant = Participant::new(
            sender.participant_id,
            sender.chat_id,
            name.clone(),
            self.locale_of(sender),
        );
        let recipient = participant.recipient();
        participants.insert(participant);
        self.state.lobby.lock().await.subscribe(recipient);
        self.state.persist(&participants);

        tracing::info!(participant = sender.participant_id, name = %name, "New participant");
        Ok(Some(("hello", vec![("name", name)])))
    }

    async fn register(&self, sender: &Sender, id: &str) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let mut participants = self.state.participants.write().await;
        let participant = participants
            .get_mut(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        if !self.event_id_pattern.is_match(id) {
            return Err(CommandError::Validation {
                field: "event_id",
                value: id.to_string(),
            });
        }
        if participant.is_playing() {
            return Err(CommandError::AlreadyPlaying(participant.id));
        }

        let quest = self
            .state
            .id_mapper
            .lock()
            .await
            .resolve(id)
            .map(str::to_string)
            .map_err(|_| CommandError::UnknownEvent(id.to_string()))?;
        let handle = self
            .state
            .quest(&quest)
            .await
            .ok_or_else(|| CommandError::UnknownEvent(id.to_string()))?;

        let mut event = handle.lock().await;
        // The identifier may have been released between resolve and lock
        if event.state() != EventState::Scheduled || event.event_id() != Some(id) {
            return Err(CommandError::UnknownEvent(id.to_string()));
        }
        let team_ref = event.join(participant);
        let team_name = event
            .team(team_ref.team)
            .map(|t| t.name().to_string())
            .unwrap_or_default();
        drop(event);

        self.state.lobby.lock().await.unsubscribe(participant.id);

        Ok(Some((
            "register_qevent_success",
            vec![("event_id", id.to_string()), ("team_name", team_name)],
        )))
    }

    async fn unregister(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let mut participants = self.state.participants.write().await;
        let participant = participants
            .get_mut(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        let team = participant
            .team
            .clone()
            .ok_or(CommandError::NotPlaying(participant.id))?;

        match self.event_for(&team).await {
            Ok(handle) => {
                handle.lock().await.leave(participant);
            }
            Err(_) => {
                participant.detach();
            }
        }
        self.state.lobby.lock().await.subscribe(participant.recipient());

        Ok(Some(("unregister_success", Vec::new())))
    }

    async fn answer(
        &self,
        sender: &Sender,
        value: &str,
        now: NaiveDateTime,
    ) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let participants = self.state.participants.read().await;
        let participant = participants
            .get(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        if !validation::is_valid_answer(value) {
            return Err(CommandError::Validation {
                field: "answer",
                value: value.to_string(),
            });
        }
        let team = participant
            .team
            .clone()
            .ok_or(CommandError::NotPlaying(participant.id))?;

        let handle = self.event_for(&team).await?;
        let mut event = handle.lock().await;
        let coordinator = event
            .team_mut(team.team)
            .ok_or(CommandError::NotPlaying(participant.id))?;

        match coordinator.check_answer(&participant.name, value, now) {
            AnswerOutcome::Correct | AnswerOutcome::Wrong => Ok(None),
            AnswerOutcome::NotAllowed => Err(CommandError::NotAllowed),
        }
    }

    async fn hint(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let participants = self.state.participants.read().await;
        let participant = participants
            .get(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        let team = participant
            .team
            .clone()
            .ok_or(CommandError::NotPlaying(participant.id))?;

        let handle = self.event_for(&team).await?;
        let mut event = handle.lock().await;
        let coordinator = event
            .team_mut(team.team)
            .ok_or(CommandError::NotPlaying(participant.id))?;

        match coordinator.give_hint(&participant.name) {
            HintOutcome::Given { .. } | HintOutcome::Exhausted => Ok(None),
            HintOutcome::NotAllowed => Err(CommandError::NotAllowed),
        }
    }

    async fn nickname(&self, sender: &Sender, name: &str) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let mut participants = self.state.participants.write().await;
        let participant = participants
            .get_mut(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        if !validation::is_valid_nickname(name) {
            return Err(CommandError::Validation {
                field: "nickname",
                value: name.to_string(),
            });
        }
        tracing::info!(participant = participant.id, from = %participant.name, to = name, "Nickname changed");
        participant.name = name.to_string();
        self.state.persist(&participants);

        Ok(Some(("change_nickname_success", vec![("name", name.to_string())])))
    }

    async fn delete(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let mut participants = self.state.participants.write().await;
        let participant = participants
            .get_mut(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;

        if let Some(team) = participant.team.clone() {
            if let Ok(handle) = self.event_for(&team).await {
                handle.lock().await.leave(participant);
            }
        }
        let recipient = participant.recipient();

        participants.remove(sender.participant_id);
        self.state.lobby.lock().await.unsubscribe(sender.participant_id);
        self.state.persist(&participants);
        tracing::info!(participant = sender.participant_id, "Participant deleted");

        // The record is gone, so reply directly
        self.state.notifier.send_template(&recipient, "deleteme_success", &[]);
        Ok(None)
    }

    async fn about_me(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let participants = self.state.participants.read().await;
        let participant = participants
            .get(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;

        let mut team_name = "-".to_string();
        if let Some(team) = &participant.team {
            if let Ok(handle) = self.event_for(team).await {
                if let Some(t) = handle.lock().await.team(team.team) {
                    team_name = t.name().to_string();
                }
            }
        }

        Ok(Some((
            "about_me",
            vec![
                ("name", participant.name.clone()),
                ("state", participant.state.to_string()),
                ("team_name", team_name),
            ],
        )))
    }

    async fn about_team(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let participants = self.state.participants.read().await;
        let participant = participants
            .get(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        let team = participant
            .team
            .clone()
            .ok_or(CommandError::NotPlaying(participant.id))?;

        let handle = self.event_for(&team).await?;
        let event = handle.lock().await;
        let coordinator = event
            .team(team.team)
            .ok_or(CommandError::NotPlaying(participant.id))?;
        let definition = coordinator.team();
        let task_count = definition.task_count();
        let task_number = (coordinator.task_index() + 1).clamp(0, task_count as i64);

        Ok(Some((
            "about_team",
            vec![
                ("team_name", definition.name.clone()),
                ("team_description", definition.description.clone()),
                ("team_communication", definition.communication.clone()),
                ("task_number", task_number.to_string()),
                ("task_count", task_count.to_string()),
            ],
        )))
    }

    async fn about_quest(&self, sender: &Sender) -> Result<Option<(&'static str, Vars)>, CommandError> {
        let participants = self.state.participants.read().await;
        let participant = participants
            .get(sender.participant_id)
            .ok_or(CommandError::UnknownParticipant(sender.participant_id))?;
        let team = participant
            .team
            .clone()
            .ok_or(CommandError::NotPlaying(participant.id))?;

        let handle = self.event_for(&team).await?;
        let event = handle.lock().await;
        let definition = event.definition();
        let duration_secs = definition.duration().num_seconds().max(0) as u64;

        Ok(Some((
            "about_quest",
            vec![
                ("quest_name", definition.name().to_string()),
                ("state", event.state().to_string()),
                ("quest_description", definition.description().to_string()),
                ("date", definition.start_date().format(DATE_FORMAT).to_string()),
                ("duration", format_duration_compact(duration_secs)),
            ],
        )))
    }
}
