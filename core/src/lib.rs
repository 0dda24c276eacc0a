pub mod commands;
pub mod definitions;
pub mod error;
pub mod events;
pub mod notify;
pub mod participants;
pub mod scheduler;
pub mod scoring;
pub mod state;
pub mod team;
pub mod validation;

// Re-exports for convenience
pub use commands::{Command, CommandRouter, Sender};
pub use definitions::{QuestDefinition, TaskDefinition, TeamDefinition};
pub use error::{CommandError, DefinitionError, EngineError};
pub use events::{EventIdMapper, EventState, QuestEvent};
pub use notify::{Messenger, NotificationHub, Notifier, Recipient, TemplateStore};
pub use participants::{Participant, ParticipantId, ParticipantState, ParticipantStore};
pub use scheduler::{QuestScheduler, SchedulerHandle};
pub use scoring::ScoringEngine;
pub use state::SharedState;
pub use team::{AnswerOutcome, HintOutcome, TeamCoordinator};
