//! State shared between the scheduler and the command router
//!
//! Lock order, outermost first: `participants`, a quest event, `id_mapper`,
//! `lobby`. Code that needs an outer lock after an inner one drops the inner
//! lock first.

mod registry;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use questbot_types::EngineConfig;
use tokio::sync::{Mutex, RwLock};

use crate::definitions::{self, QuestDefinition};
use crate::error::{DefinitionError, EngineError};
use crate::events::{EventIdMapper, QuestEvent};
use crate::notify::{NotificationHub, Notifier};
use crate::participants::{Participant, ParticipantRegistry, ParticipantStore};

pub use registry::QuestRegistry;

pub struct SharedState {
    pub config: EngineConfig,
    pub quests: RwLock<QuestRegistry>,
    pub id_mapper: Mutex<EventIdMapper>,
    /// Channel of every participant not currently playing
    pub lobby: Mutex<NotificationHub>,
    pub participants: RwLock<ParticipantRegistry>,
    pub notifier: Notifier,
    /// Cleared to stop the scheduler loop
    pub active: AtomicBool,
    store: Option<ParticipantStore>,
}

impl SharedState {
    pub fn new(config: EngineConfig, notifier: Notifier) -> Self {
        let id_mapper = EventIdMapper::new(config.event_id_digits, config.event_id_attempts);
        Self {
            quests: RwLock::new(QuestRegistry::new()),
            id_mapper: Mutex::new(id_mapper),
            lobby: Mutex::new(NotificationHub::new("lobby", notifier.clone())),
            participants: RwLock::new(ParticipantRegistry::new()),
            notifier,
            active: AtomicBool::new(true),
            store: None,
            config,
        }
    }

    /// Persist participants to `store` after every change.
    pub fn with_store(mut self, store: ParticipantStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    // --- Quests ---

    /// Wrap `definition` in a new event and register it.
    pub async fn register_quest(&self, definition: QuestDefinition) -> Result<(), DefinitionError> {
        let name = definition.name().to_string();
        let event = QuestEvent::new(
            Arc::new(definition),
            self.notifier.clone(),
            self.config.scoring.clone(),
            self.config.shuffle_teams,
        );

        if !self.quests.write().await.register(event) {
            return Err(DefinitionError::DuplicateQuest(name));
        }
        tracing::info!(quest = %name, "Registered quest");
        Ok(())
    }

    /// Register every valid definition in `dir`. Returns how many were added.
    pub async fn load_quests(&self, dir: &Path) -> Result<usize, DefinitionError> {
        let mut added = 0;
        for definition in definitions::load_directory(dir)? {
            match self.register_quest(definition).await {
                Ok(()) => added += 1,
                Err(e) => tracing::warn!(error = %e, "Skipping quest"),
            }
        }
        Ok(added)
    }

    pub async fn quest(&self, name: &str) -> Option<Arc<Mutex<QuestEvent>>> {
        self.quests.read().await.get(name)
    }

    // --- Participants ---

    /// Load stored participants, restoring them idle in the lobby.
    pub async fn restore_participants(&self) -> Result<usize, EngineError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let records = store.load()?;

        let mut participants = self.participants.write().await;
        let mut lobby = self.lobby.lock().await;
        let mut restored = 0;
        for record in records {
            let participant = Participant::from(record);
            let recipient = participant.recipient();
            if participants.insert(participant) {
                lobby.subscribe(recipient);
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Write the participant set to the store, if one is configured.
    /// Failures are logged; the in-memory state stays authoritative.
    pub fn persist(&self, participants: &ParticipantRegistry) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&participants.records()) {
            tracing::error!(error = %e, "Failed to persist participants");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::notifier;
    use crate::participants::ParticipantRecord;
    use chrono::Local;
    use std::fs;

    fn state() -> SharedState {
        SharedState::new(EngineConfig::default(), notifier().0)
    }

    #[tokio::test]
    async fn test_register_quest_rejects_duplicates() {
        use crate::definitions::fixtures::{quest, task, team};

        let state = state();
        let def = || quest("city", Local::now().naive_local(), 60, vec![team("red", vec![task("?", "x", &[])])]);
        state.register_quest(def()).await.unwrap();
        let err = state.register_quest(def()).await.unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateQuest(name) if name == "city"));
        assert!(state.quest("city").await.is_some());
    }

    #[tokio::test]
    async fn test_load_quests_from_directory() {
        let dir = std::env::temp_dir().join(format!("questbot-state-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let doc = |name: &str| {
            format!(
                "name: {name}\ndescription: d\nstart_date: 2030-01-01T10:00\nduration: 1h\nteams:\n  - name: red\n    description: r\n    communication: c\n    tasks: []\n"
            )
        };
        fs::write(dir.join("a.yml"), doc("alpha")).unwrap();
        fs::write(dir.join("b.yaml"), doc("alpha")).unwrap();
        fs::write(dir.join("c.yml"), doc("gamma")).unwrap();

        let state = state();
        assert_eq!(state.load_quests(&dir).await.unwrap(), 2);
        assert_eq!(state.quests.read().await.len(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_restore_participants_into_lobby() {
        let path = std::env::temp_dir()
            .join(format!("questbot-restore-{}", std::process::id()))
            .join("participants.json");
        let store = ParticipantStore::new(&path);
        store
            .save(&[ParticipantRecord {
                name: "amy".to_string(),
                participant_id: 7,
                chat_id: 70,
                locale: "ru".to_string(),
            }])
            .unwrap();

        let state = state().with_store(store);
        assert_eq!(state.restore_participants().await.unwrap(), 1);
        assert!(state.lobby.lock().await.contains(7));
        assert_eq!(state.participants.read().await.get(7).unwrap().locale, "ru");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stop_clears_active_flag() {
        let state = state();
        assert!(state.is_active());
        state.stop();
        assert!(!state.is_active());
    }
}
