//! Participant commands
//!
//! The router validates arguments, applies the command to the shared state
//! and replies to the sender with a localized template. Failures are
//! [`CommandError`]s; each maps to the failure template of the command that
//! produced it.

mod router;


use crate::error::CommandError;
use crate::notify::ChatId;
use crate::participants::ParticipantId;

pub use router::CommandRouter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Join the quest published under this identifier
    Register(String),
    Unregister,
    Answer(String),
    Hint,
    Nickname(String),
    DeleteMe,
    AboutMe,
    AboutTeam,
    AboutQuest,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Register(_) => "register",
            Command::Unregister => "unregister",
            Command::Answer(_) => "answer",
            Command::Hint => "hint",
            Command::Nickname(_) => "nickname",
            Command::DeleteMe => "deleteme",
            Command::AboutMe => "aboutme",
            Command::AboutTeam => "aboutteam",
            Command::AboutQuest => "aboutquest",
        }
    }

    /// Template replied to the sender when this command fails with `err`.
    pub fn failure_template(&self, err: &CommandError) -> &'static str {
        match (self, err) {
            (_, CommandError::UnknownParticipant(_)) => "unknown_participant",
            (_, CommandError::NotAllowed) => "not_allowed",
            (Command::Register(_), _) => "register_qevent_fail",
            (Command::Unregister, _) => "unregister_fail",
            (Command::Answer(_), CommandError::Validation { .. }) => "give_answer_wrong_format",
            (Command::Answer(_), _) => "give_answer_fail",
            (Command::Hint, _) => "get_hint_fail",
            (Command::Nickname(_), _) => "change_nickname_fail",
            _ => "not_playing",
        }
    }
}

/// Who sent a command, as reported by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub participant_id: ParticipantId,
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub locale: Option<String>,
}

impl Sender {
    pub fn new(participant_id: ParticipantId, chat_id: ChatId) -> Self {
        Self {
            participant_id,
            chat_id,
            username: None,
            locale: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}
