use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::events::QuestEvent;

/// Every registered quest event keyed by quest name.
///
/// Each event sits behind its own mutex so the scheduler and foreground
/// commands serialize per quest rather than globally.
#[derive(Debug, Default)]
pub struct QuestRegistry {
    events: BTreeMap<String, Arc<Mutex<QuestEvent>>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and drops `event` if its quest name is already taken.
    pub fn register(&mut self, event: QuestEvent) -> bool {
        let name = event.name().to_string();
        if self.events.contains_key(&name) {
            return false;
        }
        self.events.insert(name, Arc::new(Mutex::new(event)));
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<Mutex<QuestEvent>>> {
        self.events.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Snapshot of every event handle, in name order.
    pub fn handles(&self) -> Vec<Arc<Mutex<QuestEvent>>> {
        self.events.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
