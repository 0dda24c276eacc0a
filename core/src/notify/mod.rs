//! Participant notifications
//!
//! - [`Messenger`]: the outbound channel (implemented by the front end)
//! - [`TemplateStore`]: localized message texts with `$var` substitution
//! - [`NotificationHub`]: a subscriber set that fans messages out, used both
//!   as the global lobby and as each team's channel

mod hub;
mod messenger;
mod templates;

pub use hub::NotificationHub;
pub use messenger::{ChatId, Messenger, Notifier, Recipient};
pub use templates::{TemplateResolver, TemplateStore, render};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::EngineError;
    use crate::participants::ParticipantId;

    /// Messenger that records every delivery instead of sending it.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingMessenger {
        messages: Arc<Mutex<Vec<(ChatId, String)>>>,
        failing: Arc<Mutex<HashSet<ChatId>>>,
    }

    impl RecordingMessenger {
        pub fn messages(&self) -> Vec<(ChatId, String)> {
            self.messages.lock().unwrap().clone()
        }

        pub fn texts_for(&self, chat_id: ChatId) -> Vec<String> {
            self.messages()
                .into_iter()
                .filter(|(id, _)| *id == chat_id)
                .map(|(_, text)| text)
                .collect()
        }

        pub fn clear(&self) {
            self.messages.lock().unwrap().clear();
        }

        pub fn fail_chat(&self, chat_id: ChatId) {
            self.failing.lock().unwrap().insert(chat_id);
        }
    }

    impl Messenger for RecordingMessenger {
        fn send(&self, chat_id: ChatId, text: &str) -> Result<(), EngineError> {
            if self.failing.lock().unwrap().contains(&chat_id) {
                return Err(EngineError::Delivery {
                    chat_id,
                    message: "chat unavailable".to_string(),
                });
            }
            self.messages.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    pub fn recipient(id: ParticipantId, locale: &str) -> Recipient {
        Recipient {
            participant_id: id,
            chat_id: id,
            locale: locale.to_string(),
        }
    }

    pub fn notifier() -> (Notifier, RecordingMessenger) {
        let messenger = RecordingMessenger::default();
        let notifier = Notifier::new(
            Arc::new(messenger.clone()),
            Arc::new(TemplateStore::builtin("en")),
        );
        (notifier, messenger)
    }
}
