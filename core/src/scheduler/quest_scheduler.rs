use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, TimeDelta};
use questbot_types::formatting::format_duration_compact;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::events::{EVENT_ID_KEY, EventState, QuestEvent, compute_state};
use crate::participants::ParticipantId;
use crate::state::SharedState;

/// Display format for quest start times in announcements.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Drives every registered quest through its lifecycle from wall-clock time.
#[derive(Clone)]
pub struct QuestScheduler {
    state: Arc<SharedState>,
    registration_window: TimeDelta,
}

impl QuestScheduler {
    pub fn new(state: Arc<SharedState>) -> Self {
        let registration_window =
            TimeDelta::from_std(state.config.registration_window()).unwrap_or(TimeDelta::MAX);
        Self {
            state,
            registration_window,
        }
    }

    /// Evaluate every quest against the local wall clock.
    pub async fn tick(&self) -> usize {
        self.tick_at(Local::now().naive_local()).await
    }

    /// Evaluate every quest against `now`. Returns the number of transitions.
    pub async fn tick_at(&self, now: NaiveDateTime) -> usize {
        let handles = self.state.quests.read().await.handles();

        let mut transitions = 0;
        for handle in handles {
            if self.evaluate(&handle, now).await {
                transitions += 1;
            }
        }
        transitions
    }

    async fn evaluate(&self, handle: &Arc<Mutex<QuestEvent>>, now: NaiveDateTime) -> bool {
        let mut event = handle.lock().await;
        let definition = Arc::clone(event.definition());
        let current = event.state();
        let target = compute_state(
            now,
            definition.start_date(),
            definition.duration(),
            self.registration_window,
        );

        tracing::debug!(quest = %definition.name(), %current, %target, "Evaluated quest state");

        if target == current {
            return false;
        }
        if target < current {
            // Wall clock went backwards; the stored state wins
            if let Err(e) = event.set_state(target) {
                tracing::warn!(quest = %definition.name(), error = %e, "Ignoring lifecycle regression");
            }
            return false;
        }

        tracing::info!(quest = %definition.name(), from = %current, to = %target, "Quest state changed");

        match target {
            EventState::Scheduled => self.on_scheduled(&mut event).await,
            EventState::Running => self.on_running(&mut event, now).await,
            EventState::Finished => {
                let (members, leaderboard) = self.on_finished(&mut event).await;
                let _ = event.set_state(target);
                let name = definition.name().to_string();
                // Participants are an outer lock; release the event first
                drop(event);
                self.return_to_lobby(&name, members, &leaderboard).await;
                return true;
            }
            EventState::Unknown | EventState::Waiting => {}
        }

        let _ = event.set_state(target);
        true
    }

    async fn on_scheduled(&self, event: &mut QuestEvent) {
        let allocated = self.state.id_mapper.lock().await.allocate(event.name());
        let id = match allocated {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(quest = %event.name(), error = %e, "Quest opened without an identifier");
                return;
            }
        };
        event.annotate(EVENT_ID_KEY, id.clone());

        let definition = event.definition();
        let duration_secs = definition.duration().num_seconds().max(0) as u64;
        let vars = [
            ("quest_name", definition.name().to_string()),
            ("quest_description", definition.description().to_string()),
            ("date", definition.start_date().format(DATE_FORMAT).to_string()),
            ("duration", format_duration_compact(duration_secs)),
            ("teams", event.team_summary()),
            ("event_id", id),
        ];
        self.state
            .lobby
            .lock()
            .await
            .broadcast_template("quest_scheduled", &vars);
    }

    async fn on_running(&self, event: &mut QuestEvent, now: NaiveDateTime) {
        if let Some(id) = event.remove_annotation(EVENT_ID_KEY) {
            self.state.id_mapper.lock().await.release(&id);
        }

        self.state
            .lobby
            .lock()
            .await
            .broadcast_template("quest_running", &[("quest_name", event.name().to_string())]);

        event.start_teams(now);
    }

    /// Stop the teams and publish their scores. Returns the former team
    /// members and the rendered leaderboard.
    async fn on_finished(&self, event: &mut QuestEvent) -> (Vec<ParticipantId>, String) {
        if let Some(id) = event.remove_annotation(EVENT_ID_KEY) {
            self.state.id_mapper.lock().await.release(&id);
        }

        let members = event.finish_teams();
        for (name, score) in event.standings() {
            tracing::info!(quest = %event.name(), team = %name, score, "Final team score");
        }
        (members, event.leaderboard())
    }

    async fn return_to_lobby(&self, quest: &str, members: Vec<ParticipantId>, leaderboard: &str) {
        let mut participants = self.state.participants.write().await;

        let mut ids: BTreeSet<ParticipantId> = members.into_iter().collect();
        ids.extend(participants.members_of(quest).map(|p| p.id));

        let mut lobby = self.state.lobby.lock().await;
        for id in ids {
            let Some(participant) = participants.get_mut(id) else {
                continue;
            };
            match &participant.team {
                Some(team) if team.quest != quest => continue,
                Some(_) => {
                    participant.detach();
                }
                None => {}
            }
            lobby.subscribe(participant.recipient());
        }

        let vars = [
            ("quest_name", quest.to_string()),
            ("leaderboard", leaderboard.to_string()),
        ];
        lobby.broadcast_template("quest_finished", &vars);
    }

    /// Run the tick loop on the tokio runtime until shut down.
    pub fn spawn(self) -> SchedulerHandle {
        let state = Arc::clone(&self.state);
        let wake = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(Arc::clone(&wake)));
        SchedulerHandle { state, wake, task }
    }

    async fn run(self, wake: Arc<Notify>) {
        let interval = self.state.config.tick_interval();
        tracing::info!(?interval, "Scheduler started");

        while self.state.is_active() {
            self.tick().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake.notified() => {}
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

/// Handle to a spawned scheduler loop.
pub struct SchedulerHandle {
    state: Arc<SharedState>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Clear the active flag, wake the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.state.stop();
        self.wake.notify_one();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
