use std::collections::BTreeMap;

use crate::participants::ParticipantId;

use super::messenger::{Notifier, Recipient};

/// Fan-out of messages to a set of subscribed participants.
///
/// Subscribers are kept ordered by participant id so delivery order is
/// stable. Both subscribe and unsubscribe are idempotent and report whether
/// membership actually changed.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    label: String,
    subscribers: BTreeMap<ParticipantId, Recipient>,
    notifier: Notifier,
}

impl NotificationHub {
    pub fn new(label: impl Into<String>, notifier: Notifier) -> Self {
        Self {
            label: label.into(),
            subscribers: BTreeMap::new(),
            notifier,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Returns `false` if the participant was already subscribed.
    /// An existing subscription keeps its original recipient details.
    pub fn subscribe(&mut self, recipient: Recipient) -> bool {
        if self.subscribers.contains_key(&recipient.participant_id) {
            return false;
        }
        tracing::debug!(hub = %self.label, participant = recipient.participant_id, "Subscribed");
        self.subscribers.insert(recipient.participant_id, recipient);
        true
    }

    /// Returns `false` if the participant was not subscribed.
    pub fn unsubscribe(&mut self, participant_id: ParticipantId) -> bool {
        let removed = self.subscribers.remove(&participant_id).is_some();
        if removed {
            tracing::debug!(hub = %self.label, participant = participant_id, "Unsubscribed");
        }
        removed
    }

    pub fn contains(&self, participant_id: ParticipantId) -> bool {
        self.subscribers.contains_key(&participant_id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn subscriber_ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.subscribers.keys().copied()
    }

    /// Send literal text to every subscriber. Returns the number delivered.
    pub fn broadcast(&self, text: &str) -> usize {
        self.subscribers
            .values()
            .filter(|r| self.notifier.send_text(r, text))
            .count()
    }

    /// Render `name` per subscriber locale and send it. Returns the number delivered.
    pub fn broadcast_template(&self, name: &str, vars: &[(&str, String)]) -> usize {
        tracing::debug!(hub = %self.label, template = name, subscribers = self.len(), "Broadcast");
        self.subscribers
            .values()
            .filter(|r| self.notifier.send_template(r, name, vars))
            .count()
    }

    /// Unsubscribe everyone, returning who was subscribed.
    pub fn clear(&mut self) -> Vec<ParticipantId> {
        let ids: Vec<_> = self.subscribers.keys().copied().collect();
        self.subscribers.clear();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::{RecordingMessenger, notifier, recipient};

    fn hub() -> (NotificationHub, RecordingMessenger) {
        let (notifier, messenger) = notifier();
        (NotificationHub::new("test", notifier), messenger)
    }

    #[test]
    fn test_subscribe_and_unsubscribe_are_idempotent() {
        let (mut hub, _) = hub();
        assert!(hub.subscribe(recipient(1, "en")));
        assert!(!hub.subscribe(recipient(1, "en")));
        assert_eq!(hub.len(), 1);

        assert!(hub.unsubscribe(1));
        assert!(!hub.unsubscribe(1));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let (mut hub, messenger) = hub();
        hub.subscribe(recipient(2, "en"));
        hub.subscribe(recipient(1, "en"));

        assert_eq!(hub.broadcast("hello all"), 2);
        assert_eq!(
            messenger.messages(),
            vec![(1, "hello all".to_string()), (2, "hello all".to_string())]
        );
    }

    #[test]
    fn test_broadcast_template_is_localized_per_subscriber() {
        let (mut hub, messenger) = hub();
        hub.subscribe(recipient(1, "en"));
        hub.subscribe(recipient(2, "ru"));
        hub.subscribe(recipient(3, "fr"));

        let vars = [("username", "bob".to_string())];
        assert_eq!(hub.broadcast_template("get_hint_empty", &vars), 3);

        let texts = messenger.texts_for(1);
        assert_eq!(texts, vec!["bob asked for a hint, but there are no hints left."]);
        assert!(messenger.texts_for(2)[0].starts_with("bob запросил"));
        // Unsupported locale falls back to the default
        assert_eq!(messenger.texts_for(3), texts);
    }

    #[test]
    fn test_unknown_template_delivers_nothing() {
        let (mut hub, messenger) = hub();
        hub.subscribe(recipient(1, "en"));
        assert_eq!(hub.broadcast_template("does_not_exist", &[]), 0);
        assert!(messenger.messages().is_empty());
    }

    #[test]
    fn test_failed_delivery_is_not_counted() {
        let (mut hub, messenger) = hub();
        hub.subscribe(recipient(1, "en"));
        hub.subscribe(recipient(2, "en"));
        messenger.fail_chat(2);

        assert_eq!(hub.broadcast("ping"), 1);
        assert_eq!(messenger.texts_for(1), vec!["ping"]);
    }

    #[test]
    fn test_clear_returns_former_subscribers() {
        let (mut hub, _) = hub();
        hub.subscribe(recipient(5, "en"));
        hub.subscribe(recipient(3, "en"));
        assert_eq!(hub.clear(), vec![3, 5]);
        assert!(hub.is_empty());
        assert_eq!(hub.broadcast("anyone?"), 0);
    }
}
