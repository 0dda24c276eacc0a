use std::collections::HashMap;

use rand::Rng;

use crate::error::EngineError;

/// Short numeric identifiers for events open to registration.
///
/// Identifiers are drawn at random with a bounded number of retries. Once
/// the identifier space is close to saturation allocation can fail.
#[derive(Debug, Clone)]
pub struct EventIdMapper {
    entries: HashMap<String, String>,
    digits: u32,
    attempts: u32,
}

impl Default for EventIdMapper {
    fn default() -> Self {
        Self::new(4, 10)
    }
}

impl EventIdMapper {
    pub fn new(digits: u32, attempts: u32) -> Self {
        Self {
            entries: HashMap::new(),
            digits: digits.max(1),
            attempts: attempts.max(1),
        }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Map a fresh identifier to `quest` and return it.
    pub fn allocate(&mut self, quest: &str) -> Result<String, EngineError> {
        let space = 10u64.saturating_pow(self.digits);
        let width = self.digits as usize;
        let mut rng = rand::thread_rng();

        for _ in 0..self.attempts {
            let id = format!("{:0width$}", rng.gen_range(0..space));
            if self.entries.contains_key(&id) {
                continue;
            }
            tracing::info!(quest, event_id = %id, "Allocated event id");
            self.entries.insert(id.clone(), quest.to_string());
            return Ok(id);
        }

        tracing::error!(
            quest,
            attempts = self.attempts,
            live = self.entries.len(),
            "Event id allocation exhausted"
        );
        Err(EngineError::AllocationExhausted {
            attempts: self.attempts,
        })
    }

    /// Name of the quest mapped to `id`.
    pub fn resolve(&self, id: &str) -> Result<&str, EngineError> {
        self.entries
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| EngineError::EventNotFound(id.to_string()))
    }

    /// Returns whether an entry was removed.
    pub fn release(&mut self, id: &str) -> bool {
        let removed = self.entries.remove(id);
        if let Some(quest) = &removed {
            tracing::info!(quest = %quest, event_id = %id, "Released event id");
        }
        removed.is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
