//! Append-only chat log with a bounded replay window.

use std::time::SystemTime;

use thiserror::Error;

use crate::state::poll::PollId;

/// Number of messages replayed when no window is configured.
pub const DEFAULT_CHAT_WINDOW: usize = 50;

/// A stored chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender identifier as supplied by the client.
    pub sender_id: String,
    /// Sender display name as supplied by the client.
    pub sender_name: String,
    /// Trimmed, non-empty body.
    pub text: String,
    /// Client timestamp, or the append instant when the client sent none.
    pub timestamp: SystemTime,
    /// Poll active when the message was appended.
    pub poll_id: Option<PollId>,
}

/// Chat message as received from a client.
#[derive(Debug, Clone, Default)]
pub struct NewChatMessage {
    /// Sender identifier.
    pub sender_id: String,
    /// Sender display name.
    pub sender_name: String,
    /// Body.
    pub text: String,
    /// Optional client timestamp.
    pub timestamp: Option<SystemTime>,
}

/// Errors raised by [`ChatLog::append`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The message body is blank.
    #[error("chat message must not be empty")]
    EmptyText,
}

/// Full chat history for the session. Replay is limited to the last `window` messages.
#[derive(Debug)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    window: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_WINDOW)
    }
}

impl ChatLog {
    /// Create an empty log replaying at most `window` messages (at least one).
    pub fn new(window: usize) -> Self {
        Self {
            messages: Vec::new(),
            window: window.max(1),
        }
    }

    /// Append a message stamped with `poll_id`.
    pub fn append(
        &mut self,
        message: NewChatMessage,
        poll_id: Option<PollId>,
        now: SystemTime,
    ) -> Result<&ChatMessage, ChatError> {
        let text = message.text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }

        self.messages.push(ChatMessage {
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: text.to_owned(),
            timestamp: message.timestamp.unwrap_or(now),
            poll_id,
        });
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// The last `window` messages, oldest first.
    pub fn window(&self) -> impl ExactSizeIterator<Item = &ChatMessage> {
        let start = self.messages.len().saturating_sub(self.window);
        self.messages[start..].iter()
    }

    /// Every message appended so far, oldest first.
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages appended.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    fn said(text: &str) -> NewChatMessage {
        NewChatMessage {
            sender_id: "ana".into(),
            sender_name: "Ana".into(),
            text: text.into(),
            timestamp: None,
        }
    }

    #[test]
    fn blank_message_is_rejected() {
        let mut log = ChatLog::default();
        assert_eq!(
            log.append(said("   "), None, SystemTime::now()).unwrap_err(),
            ChatError::EmptyText
        );
        assert!(log.is_empty());
    }

    #[test]
    fn append_stamps_poll_and_time() {
        let mut log = ChatLog::default();
        let poll_id = Uuid::new_v4();
        let now = SystemTime::now();

        let message = log.append(said(" hello "), Some(poll_id), now).unwrap();
        assert_eq!(message.text, "hello");
        assert_eq!(message.timestamp, now);
        assert_eq!(message.poll_id, Some(poll_id));

        let earlier = now - Duration::from_secs(3);
        let mut stamped = said("again");
        stamped.timestamp = Some(earlier);
        assert_eq!(log.append(stamped, None, now).unwrap().timestamp, earlier);
    }

    #[test]
    fn window_keeps_latest_messages() {
        let mut log = ChatLog::new(3);
        for index in 0..5 {
            log.append(said(&format!("m{index}")), None, SystemTime::now())
                .unwrap();
        }

        let texts = log
            .window()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
        assert_eq!(log.len(), 5);
        assert_eq!(log.all()[0].text, "m0");
    }
}
