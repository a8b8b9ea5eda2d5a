use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{poll::CreatePollRequest, system_time_from_millis},
    state::{chat::NewChatMessage, roster::StudentId},
};

/// Commands accepted from WebSocket clients, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the roster. `student_id` is the token returned by an earlier `joined` event.
    Join {
        #[serde(default)]
        student_id: Option<StudentId>,
        name: String,
    },
    CreatePoll(CreatePollRequest),
    SubmitVote {
        poll_id: Uuid,
        option_id: u8,
        /// Defaults to the identity the connection joined as.
        #[serde(default)]
        student_id: Option<StudentId>,
    },
    /// The student's countdown ran out before it answered.
    Timeout {
        poll_id: Uuid,
        #[serde(default)]
        student_id: Option<StudentId>,
    },
    EndPoll {
        poll_id: Uuid,
    },
    Kick {
        student_id: StudentId,
    },
    ChatSend(ChatSendPayload),
    RequestCurrentState,
    RequestPollHistory,
    RequestChatHistory,
}

/// Errors raised while decoding a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum ClientMessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate the payloads that carry constraints.
    pub fn from_json_str(text: &str) -> Result<Self, ClientMessageError> {
        let message = serde_json::from_str::<Self>(text)?;
        if let Self::CreatePoll(request) = &message {
            request.validate()?;
        }
        Ok(message)
    }
}

/// Chat message sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSendPayload {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Client clock, in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl From<ChatSendPayload> for NewChatMessage {
    fn from(value: ChatSendPayload) -> Self {
        Self {
            sender_id: value.sender_id,
            sender_name: value.sender_name,
            text: value.text,
            timestamp: value.timestamp.map(system_time_from_millis),
        }
    }
}

/// Machine-readable category of an [`ErrorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Degraded,
    Persistence,
}

/// Sent to the originator of a command that was refused.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
}

/// Advisory sent to the originator when a write could not be persisted.
///
/// The live session is unaffected.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoticeEvent {
    pub kind: ErrorKind,
    pub message: String,
}
