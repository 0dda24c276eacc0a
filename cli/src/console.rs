use std::io::Write;

use questbot_core::EngineError;
use questbot_core::notify::{ChatId, Messenger};

/// Prints outbound messages to stdout, one block per message.
#[derive(Debug, Default)]
pub struct ConsoleMessenger;

impl Messenger for ConsoleMessenger {
    fn send(&self, chat_id: ChatId, text: &str) -> Result<(), EngineError> {
        let mut out = std::io::stdout().lock();
        let body = text.replace('\n', "\n    ");
        writeln!(out, "[chat {chat_id}] {body}").map_err(|e| EngineError::Delivery {
            chat_id,
            message: e.to_string(),
        })
    }
}
