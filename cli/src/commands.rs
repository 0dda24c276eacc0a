//! Operator commands of the console (not participant commands).

use std::sync::Arc;

use questbot_core::scheduler::DATE_FORMAT;
use questbot_core::{QuestScheduler, SharedState};
use questbot_types::formatting::format_duration_compact;

pub async fn list_quests(state: Arc<SharedState>) {
    let handles = state.quests.read().await.handles();
    if handles.is_empty() {
        println!("No quests registered");
        return;
    }

    for handle in handles {
        let event = handle.lock().await;
        let definition = event.definition();
        let duration = definition.duration().num_seconds().max(0) as u64;
        println!(
            "{:<24} {:<10} {} ({}) id={} teams={}",
            definition.name(),
            event.state(),
            definition.start_date().format(DATE_FORMAT),
            format_duration_compact(duration),
            event.event_id().unwrap_or("-"),
            event.teams().len()
        );
        for team in event.teams() {
            println!(
                "    {:<20} members={} task={}/{} score={}",
                team.name(),
                team.hub().len(),
                (team.task_index() + 1).max(0),
                team.team().task_count(),
                team.score()
            );
        }
    }
}

pub async fn list_participants(state: Arc<SharedState>) {
    let participants = state.participants.read().await;
    if participants.is_empty() {
        println!("No participants");
        return;
    }

    for p in participants.iter() {
        let team = p
            .team
            .as_ref()
            .map(|t| format!("{}#{}", t.quest, t.team))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6} {:<25} {:<3} {:<8} {}",
            p.id, p.name, p.locale, p.state, team
        );
    }
}

pub async fn tick(scheduler: &QuestScheduler) {
    let transitions = scheduler.tick().await;
    println!("Tick: {transitions} transition(s)");
}

pub fn exit() {
    println!("Exiting...");
}
