//! Team progress through a quest's task list.

mod coordinator;

pub use coordinator::{AnswerOutcome, HintOutcome, TaskCursor, TeamCoordinator};
