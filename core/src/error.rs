use std::path::PathBuf;

use thiserror::Error;

use crate::events::EventState;
use crate::participants::ParticipantId;

/// Failures while reading or validating quest definitions.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("TOML parse error in {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unsupported definition file {0:?} (expected .yml, .yaml or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid quest definition: {0}")]
    Invalid(String),

    #[error("invalid start_date {0:?}")]
    InvalidStartDate(String),

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("quest {0:?} is already registered")]
    DuplicateQuest(String),
}

/// Engine-level failures. None of these are meant to reach a participant.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no free event identifier after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error("unknown event identifier {0:?}")]
    EventNotFound(String),

    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition { from: EventState, to: EventState },

    #[error("template {name:?} has no text for locale {locale:?}")]
    TemplateNotFound { name: String, locale: String },

    #[error("storage error at {path:?}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("message delivery to chat {chat_id} failed: {message}")]
    Delivery { chat_id: i64, message: String },
}

/// Participant-facing command failures. Each maps to a reply template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("invalid {field}: {value:?}")]
    Validation { field: &'static str, value: String },

    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("unknown or expired event identifier {0:?}")]
    UnknownEvent(String),

    #[error("participant {0} is already playing")]
    AlreadyPlaying(ParticipantId),

    #[error("participant {0} is not playing")]
    NotPlaying(ParticipantId),

    #[error("team has no active task")]
    NotAllowed,
}
