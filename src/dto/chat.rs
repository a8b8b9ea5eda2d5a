use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::epoch_millis, state::chat::ChatMessage};

/// Chat message as broadcast to peers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessageDto {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub poll_id: Option<Uuid>,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            text: message.text.clone(),
            timestamp: epoch_millis(message.timestamp),
            poll_id: message.poll_id,
        }
    }
}
