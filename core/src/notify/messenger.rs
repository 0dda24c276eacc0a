use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::participants::ParticipantId;

use super::templates::{TemplateResolver, render};

/// Chat (conversation) identifier on the outbound channel.
pub type ChatId = i64;

/// Outbound messaging channel (chat bot API, console, test recorder).
pub trait Messenger: Send + Sync {
    fn send(&self, chat_id: ChatId, text: &str) -> Result<(), EngineError>;
}

/// Where and in which language a participant receives messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub participant_id: ParticipantId,
    pub chat_id: ChatId,
    pub locale: String,
}

/// Messenger + template store pair shared by every hub.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    templates: Arc<dyn TemplateResolver>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, templates: Arc<dyn TemplateResolver>) -> Self {
        Self {
            messenger,
            templates,
        }
    }

    /// Render `name` for `locale`, falling back per the resolver's rules.
    pub fn render(&self, name: &str, locale: &str, vars: &[(&str, String)]) -> Result<String, EngineError> {
        let template =
            self.templates
                .resolve(name, locale)
                .ok_or_else(|| EngineError::TemplateNotFound {
                    name: name.to_string(),
                    locale: locale.to_string(),
                })?;
        Ok(render(template, vars))
    }

    /// Send literal text. Delivery failures are logged, never propagated.
    pub fn send_text(&self, recipient: &Recipient, text: &str) -> bool {
        match self.messenger.send(recipient.chat_id, text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    participant = recipient.participant_id,
                    error = %e,
                    "Message delivery failed"
                );
                false
            }
        }
    }

    /// Render a template in the recipient's locale and send it.
    pub fn send_template(&self, recipient: &Recipient, name: &str, vars: &[(&str, String)]) -> bool {
        match self.render(name, &recipient.locale, vars) {
            Ok(text) => self.send_text(recipient, &text),
            Err(e) => {
                tracing::error!(error = %e, "Cannot render message template");
                false
            }
        }
    }
}
