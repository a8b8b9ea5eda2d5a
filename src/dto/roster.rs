use serde::Serialize;
use utoipa::ToSchema;

use crate::state::roster::{StudentId, StudentSession};

/// Roster line shown to the teacher.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntry {
    pub id: StudentId,
    pub name: String,
}

impl From<&StudentSession> for RosterEntry {
    fn from(session: &StudentSession) -> Self {
        Self {
            id: session.id.clone(),
            name: session.display_name.clone(),
        }
    }
}

/// Sent to a student once its join is accepted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinedEvent {
    /// Token to replay on later joins.
    pub student_id: StudentId,
    pub name: String,
    /// Whether the student already answered the current poll.
    pub answered: bool,
}

/// Answered flag for the receiving student.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct AnsweredStatusEvent {
    pub answered: bool,
}

/// Sent to a student right before the server closes its connection.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KickedEvent {
    pub message: String,
}

/// Category of an [`InfoMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InfoKind {
    StudentRemoved,
}

/// Human-readable announcement broadcast to everyone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InfoMessage {
    pub kind: InfoKind,
    pub content: String,
}
