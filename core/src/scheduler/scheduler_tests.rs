//! Scheduler scenarios
//!
//! Time is injected through `tick_at`, so a whole quest lifecycle runs in a
//! few calls without sleeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use questbot_types::EngineConfig;

use super::QuestScheduler;
use crate::definitions::QuestDefinition;
use crate::definitions::fixtures::{quest, task, team};
use crate::events::EventState;
use crate::notify::testing::{RecordingMessenger, notifier};
use crate::participants::{Participant, ParticipantId, ParticipantState};
use crate::state::SharedState;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn minutes(m: i64) -> TimeDelta {
    TimeDelta::minutes(m)
}

struct Harness {
    state: Arc<SharedState>,
    scheduler: QuestScheduler,
    messenger: RecordingMessenger,
}

fn make_harness(config: EngineConfig) -> Harness {
    let (notifier, messenger) = notifier();
    let state = Arc::new(SharedState::new(config, notifier));
    Harness {
        scheduler: QuestScheduler::new(Arc::clone(&state)),
        state,
        messenger,
    }
}

fn harness() -> Harness {
    make_harness(EngineConfig {
        shuffle_teams: false,
        ..EngineConfig::default()
    })
}

/// Quest "city" with two one-task teams, 60 minutes long.
fn city(start: NaiveDateTime) -> QuestDefinition {
    quest(
        "city",
        start,
        60,
        vec![
            team("red", vec![task("Capital of France?", "paris", &["Eiffel"])]),
            team("blue", vec![task("2+2?", "4", &[])]),
        ],
    )
}

impl Harness {
    async fn add_participant(&self, id: ParticipantId) {
        let participant = Participant::new(id, id, format!("p{id}"), "en");
        let recipient = participant.recipient();
        self.state.participants.write().await.insert(participant);
        self.state.lobby.lock().await.subscribe(recipient);
    }

    /// Join the way the register command does: lobby -> team channel.
    async fn join(&self, quest: &str, id: ParticipantId) {
        let mut participants = self.state.participants.write().await;
        let participant = participants.get_mut(id).unwrap();
        let event = self.state.quest(quest).await.unwrap();
        event.lock().await.join(participant);
        self.state.lobby.lock().await.unsubscribe(id);
    }

    async fn state_of(&self, quest: &str) -> EventState {
        self.state.quest(quest).await.unwrap().lock().await.state()
    }

    async fn event_id_of(&self, quest: &str) -> Option<String> {
        let event = self.state.quest(quest).await.unwrap();
        let event = event.lock().await;
        event.event_id().map(str::to_string)
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let h = harness();
    let start = base() + minutes(10);
    h.state.register_quest(city(start)).await.unwrap();
    h.add_participant(1).await;
    h.add_participant(2).await;

    // Inside the 30 minute registration window
    assert_eq!(h.scheduler.tick_at(base()).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Scheduled);
    let id = h.event_id_of("city").await.expect("identifier allocated");
    assert_eq!(h.state.id_mapper.lock().await.resolve(&id).unwrap(), "city");
    let announcement = &h.messenger.texts_for(1)[0];
    assert!(announcement.contains("New quest available!"));
    assert!(announcement.contains(&format!("/register {id}")));
    assert!(announcement.contains("Starts: 2030-06-01 12:10"));
    assert!(announcement.contains("Duration: 1h"));

    // Same timestamp again: nothing to do
    assert_eq!(h.scheduler.tick_at(base()).await, 0);

    h.join("city", 1).await;
    h.join("city", 2).await;
    h.messenger.clear();

    assert_eq!(h.scheduler.tick_at(start).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Running);
    assert!(h.event_id_of("city").await.is_none());
    assert!(h.state.id_mapper.lock().await.is_empty());
    assert_eq!(
        h.messenger.texts_for(1).last().unwrap(),
        "New task #1:\nCapital of France?"
    );
    assert_eq!(h.messenger.texts_for(2).last().unwrap(), "New task #1:\n2+2?");

    assert_eq!(h.scheduler.tick_at(start + minutes(60)).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Finished);
}

#[tokio::test]
async fn test_lifecycle_never_moves_backward() {
    let h = harness();
    let start = base() + minutes(10);
    h.state.register_quest(city(start)).await.unwrap();

    h.scheduler.tick_at(start + minutes(5)).await;
    assert_eq!(h.state_of("city").await, EventState::Running);

    // Clock skew back into the registration window
    assert_eq!(h.scheduler.tick_at(base()).await, 0);
    assert_eq!(h.state_of("city").await, EventState::Running);
    assert!(h.event_id_of("city").await.is_none());
    assert!(h.state.id_mapper.lock().await.is_empty());
}

#[tokio::test]
async fn test_waiting_before_window_opens() {
    let h = harness();
    h.state.register_quest(city(base() + minutes(120))).await.unwrap();
    h.add_participant(1).await;

    assert_eq!(h.scheduler.tick_at(base()).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Waiting);
    assert!(h.event_id_of("city").await.is_none());
    assert!(h.messenger.messages().is_empty());

    assert_eq!(h.scheduler.tick_at(base() + minutes(90)).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Scheduled);
}

#[tokio::test]
async fn test_skipped_stage_runs_only_landing_handler() {
    let h = harness();
    h.state.register_quest(city(base() - minutes(5))).await.unwrap();
    h.add_participant(1).await;

    assert_eq!(h.scheduler.tick_at(base()).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Running);
    assert!(h.state.id_mapper.lock().await.is_empty());
    assert_eq!(
        h.messenger.texts_for(1),
        vec!["Quest city has started. Registration is closed."]
    );
}

#[tokio::test]
async fn test_every_quest_sees_the_same_tick() {
    let h = harness();
    let early = quest(
        "early",
        base() + minutes(10),
        30,
        vec![team("green", vec![task("?", "x", &[])])],
    );
    h.state.register_quest(early).await.unwrap();
    h.state.register_quest(city(base() + minutes(20))).await.unwrap();

    assert_eq!(h.scheduler.tick_at(base()).await, 2);
    let a = h.event_id_of("early").await.unwrap();
    let b = h.event_id_of("city").await.unwrap();
    assert_ne!(a, b);
    assert_eq!(h.state.id_mapper.lock().await.len(), 2);

    // "early" starts, "city" stays open for registration
    assert_eq!(h.scheduler.tick_at(base() + minutes(15)).await, 1);
    assert_eq!(h.state_of("early").await, EventState::Running);
    assert_eq!(h.state_of("city").await, EventState::Scheduled);
    assert_eq!(h.state.id_mapper.lock().await.resolve(&b).unwrap(), "city");
}

#[tokio::test]
async fn test_finish_publishes_scores_and_returns_players() {
    let h = harness();
    let start = base() + minutes(10);
    h.state.register_quest(city(start)).await.unwrap();
    for id in 1..=3 {
        h.add_participant(id).await;
    }

    h.scheduler.tick_at(base()).await;
    for id in 1..=3 {
        h.join("city", id).await;
    }
    assert!(h.state.lobby.lock().await.is_empty());
    h.scheduler.tick_at(start).await;

    // Blue (participant 2) solves its task instantly
    {
        let event = h.state.quest("city").await.unwrap();
        let mut event = event.lock().await;
        event.team_mut(1).unwrap().check_answer("p2", "4", start);
    }
    h.messenger.clear();

    h.scheduler.tick_at(start + minutes(60)).await;

    let participants = h.state.participants.read().await;
    for id in 1..=3 {
        let p = participants.get(id).unwrap();
        assert_eq!(p.state, ParticipantState::Idle);
        assert!(p.team.is_none());
    }
    drop(participants);

    let lobby = h.state.lobby.lock().await;
    assert_eq!(lobby.subscriber_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    drop(lobby);

    let texts = h.messenger.texts_for(2);
    assert_eq!(
        texts[0],
        "Team blue completed 1 of 1 tasks and scored 5,000 points."
    );
    assert_eq!(texts[1], "The quest is over for your team. Thanks for playing!");
    assert_eq!(
        texts[2],
        "Quest city is finished!\n\nResults:\n1. blue - 5,000\n2. red - 0"
    );

    let event = h.state.quest("city").await.unwrap();
    let event = event.lock().await;
    assert!(event.teams().iter().all(|t| t.hub().is_empty() && !t.is_running()));
}

#[tokio::test]
async fn test_exhausted_identifiers_leave_quest_without_id() {
    let h = make_harness(EngineConfig {
        event_id_digits: 1,
        shuffle_teams: false,
        ..EngineConfig::default()
    });
    {
        let mut mapper = h.state.id_mapper.lock().await;
        let mut n = 0;
        while mapper.len() < 10 {
            let _ = mapper.allocate(&format!("filler{n}"));
            n += 1;
        }
    }
    h.state.register_quest(city(base() + minutes(10))).await.unwrap();
    h.add_participant(1).await;

    assert_eq!(h.scheduler.tick_at(base()).await, 1);
    assert_eq!(h.state_of("city").await, EventState::Scheduled);
    assert!(h.event_id_of("city").await.is_none());
    assert!(h.messenger.messages().is_empty());

    // Still starts on time
    h.scheduler.tick_at(base() + minutes(10)).await;
    assert_eq!(h.state_of("city").await, EventState::Running);
    assert_eq!(h.state.id_mapper.lock().await.len(), 10);
}

#[tokio::test]
async fn test_spawned_loop_ticks_and_shuts_down() {
    let h = make_harness(EngineConfig {
        tick_interval_secs: 1,
        shuffle_teams: false,
        ..EngineConfig::default()
    });
    let start = Local::now().naive_local() + minutes(10);
    h.state.register_quest(city(start)).await.unwrap();

    let handle = h.scheduler.clone().spawn();

    let mut scheduled = false;
    for _ in 0..100 {
        if h.state_of("city").await == EventState::Scheduled {
            scheduled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(scheduled);

    handle.shutdown().await;
    assert!(!h.state.is_active());
}
