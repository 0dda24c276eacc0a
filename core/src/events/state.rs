use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};

/// Lifecycle of a quest event. Ordered: a stored state may only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EventState {
    /// Registered but never evaluated by the scheduler
    #[default]
    Unknown,
    /// Registration window not yet open
    Waiting,
    /// Registration open, a short identifier is published
    Scheduled,
    Running,
    Finished,
}

impl EventState {
    pub fn is_active(self) -> bool {
        matches!(self, EventState::Scheduled | EventState::Running)
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventState::Unknown => "UNKNOWN",
            EventState::Waiting => "WAITING",
            EventState::Scheduled => "SCHEDULED",
            EventState::Running => "RUNNING",
            EventState::Finished => "FINISHED",
        };
        f.pad(s)
    }
}

/// State a quest should be in at `now`.
///
/// ```text
///   Waiting        Scheduled        Running          Finished
/// ----------|----------------|-----------------|------------->
///   start - window         start       start + duration
/// ```
pub fn compute_state(
    now: NaiveDateTime,
    start: NaiveDateTime,
    duration: TimeDelta,
    registration_window: TimeDelta,
) -> EventState {
    let opens = start
        .checked_sub_signed(registration_window)
        .unwrap_or(NaiveDateTime::MIN);
    let ends = start.checked_add_signed(duration).unwrap_or(NaiveDateTime::MAX);

    if now < opens {
        EventState::Waiting
    } else if now < start {
        EventState::Scheduled
    } else if now < ends {
        EventState::Running
    } else {
        EventState::Finished
    }
}
