//! Quest events: lifecycle state, short identifiers and team assignment.

mod id_mapper;
mod quest_event;
mod state;

pub use id_mapper::EventIdMapper;
pub use quest_event::{EVENT_ID_KEY, QuestEvent};
pub use state::{EventState, compute_state};
