use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::notify::ChatId;

use super::{Participant, ParticipantId};

/// Persisted form of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub name: String,
    pub participant_id: ParticipantId,
    pub chat_id: ChatId,
    pub locale: String,
}

impl From<&Participant> for ParticipantRecord {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.name.clone(),
            participant_id: p.id,
            chat_id: p.chat_id,
            locale: p.locale.clone(),
        }
    }
}

impl From<ParticipantRecord> for Participant {
    fn from(r: ParticipantRecord) -> Self {
        Participant::new(r.participant_id, r.chat_id, r.name, r.locale)
    }
}

/// Default directory for runtime data (`<data dir>/questbot`)
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("questbot"))
}

/// JSON file holding `{ "<id>": record }`.
#[derive(Debug, Clone)]
pub struct ParticipantStore {
    path: PathBuf,
}

impl ParticipantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl ToString) -> EngineError {
        EngineError::Storage {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    /// Load every record. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<ParticipantRecord>, EngineError> {
        if !self.path.exists() {
            tracing::debug!(path = ?self.path, "No participant store yet");
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: BTreeMap<ParticipantId, ParticipantRecord> =
            serde_json::from_str(&contents).map_err(|e| self.error(e))?;

        tracing::info!(path = ?self.path, count = records.len(), "Loaded participants");
        Ok(records.into_values().collect())
    }

    /// Replace the file contents with `records`.
    pub fn save(&self, records: &[ParticipantRecord]) -> Result<(), EngineError> {
        let map: BTreeMap<ParticipantId, &ParticipantRecord> =
            records.iter().map(|r| (r.participant_id, r)).collect();
        let json = serde_json::to_string_pretty(&map).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;

        tracing::debug!(path = ?self.path, count = records.len(), "Saved participants");
        Ok(())
    }
}
