//! Quest lifecycle scheduler
//!
//! Each tick captures one timestamp and recomputes every quest's state:
//!
//! ```text
//! WAITING ──► SCHEDULED ──────► RUNNING ───────► FINISHED
//!             allocate id       release id       release id
//!             announce in       announce in      publish scores
//!             lobby             lobby            stop teams
//!                               start teams      members back to lobby
//! ```
//!
//! A quest that skips a stage (e.g. registered after its start) only runs
//! the handler of the stage it lands in.

mod quest_scheduler;

#[cfg(test)]
mod scheduler_tests;

pub use quest_scheduler::{DATE_FORMAT, QuestScheduler, SchedulerHandle};
