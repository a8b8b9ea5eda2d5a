//! Connected students and their answered status for the current poll.

use std::{collections::HashSet, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{channel::PeerId, poll::PollId};

/// Stable token identifying a student across reconnects.
///
/// Issued by the server on first join and replayed by the client on later joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Mint a fresh random token.
    pub fn issue() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StudentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A connected student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSession {
    /// Reconnection token.
    pub id: StudentId,
    /// Name chosen on first join; never changes afterwards.
    pub display_name: String,
    /// Whether the student voted or timed out on `current_poll_id`.
    pub answered: bool,
    /// Poll the answered flag refers to.
    pub current_poll_id: Option<PollId>,
    /// Connection currently carrying this student.
    pub peer_id: PeerId,
}

/// Where a joining student should be bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollBinding {
    /// Current poll, if any.
    pub poll_id: Option<PollId>,
    /// Whether the poll ledger already holds an answer from this student.
    pub answered: bool,
}

/// Result of [`RosterRegistry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new session was created.
    Registered {
        /// Answered flag restored from the poll ledger.
        answered: bool,
    },
    /// The student was already on the roster; only the connection was rebound.
    Rejoined {
        /// Unchanged answered flag.
        answered: bool,
    },
}

impl JoinOutcome {
    /// Answered flag to report back to the joining peer.
    pub fn answered(&self) -> bool {
        match self {
            Self::Registered { answered } | Self::Rejoined { answered } => *answered,
        }
    }
}

/// Errors raised by roster operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// The display name is blank.
    #[error("display name must not be empty")]
    EmptyName,
    /// The student was kicked and cannot come back.
    #[error("student `{0}` was removed by the teacher")]
    Removed(StudentId),
    /// The student is not connected.
    #[error("student `{0}` is not connected")]
    NotConnected(StudentId),
    /// The connection already carries another student.
    #[error("connection already joined as `{0}`")]
    PeerBound(StudentId),
}

/// Answered and total student counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerCounts {
    /// Students that answered the current poll.
    pub answered: usize,
    /// Connected students.
    pub total: usize,
}

/// Registry of connected students in join order.
#[derive(Debug, Default)]
pub struct RosterRegistry {
    sessions: IndexMap<StudentId, StudentSession>,
    removed: HashSet<StudentId>,
}

impl RosterRegistry {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` on `peer_id`, or rebind an existing session to that connection.
    pub fn join(
        &mut self,
        id: StudentId,
        display_name: &str,
        peer_id: PeerId,
        binding: PollBinding,
    ) -> Result<JoinOutcome, RosterError> {
        if self.removed.contains(&id) {
            return Err(RosterError::Removed(id));
        }
        if let Some(bound) = self
            .student_for_peer(peer_id)
            .filter(|bound| **bound != id)
        {
            return Err(RosterError::PeerBound(bound.clone()));
        }

        if let Some(session) = self.sessions.get_mut(&id) {
            session.peer_id = peer_id;
            return Ok(JoinOutcome::Rejoined {
                answered: session.answered,
            });
        }

        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(RosterError::EmptyName);
        }

        let answered = binding.poll_id.is_some() && binding.answered;
        self.sessions.insert(
            id.clone(),
            StudentSession {
                id,
                display_name: display_name.to_owned(),
                answered,
                current_poll_id: binding.poll_id,
                peer_id,
            },
        );
        Ok(JoinOutcome::Registered { answered })
    }

    /// Look up a session by token.
    pub fn session(&self, id: &StudentId) -> Option<&StudentSession> {
        self.sessions.get(id)
    }

    /// Student carried by `peer_id`, if that connection joined.
    pub fn student_for_peer(&self, peer_id: PeerId) -> Option<&StudentId> {
        self.sessions
            .values()
            .find(|session| session.peer_id == peer_id)
            .map(|session| &session.id)
    }

    /// Whether `id` answered `poll_id`. Unknown students report `None`.
    pub fn has_answered(&self, id: &StudentId, poll_id: PollId) -> Option<bool> {
        self.sessions
            .get(id)
            .map(|session| session.answered && session.current_poll_id == Some(poll_id))
    }

    /// Mark `id` as answered on `poll_id`. Returns whether the flag changed.
    pub fn mark_answered(&mut self, id: &StudentId, poll_id: PollId) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if !session.answered || session.current_poll_id != Some(poll_id) => {
                session.answered = true;
                session.current_poll_id = Some(poll_id);
                true
            }
            _ => false,
        }
    }

    /// Rebind every session to a freshly created poll.
    pub fn reset(&mut self, poll_id: PollId) {
        for session in self.sessions.values_mut() {
            session.answered = false;
            session.current_poll_id = Some(poll_id);
        }
    }

    /// Drop a session, keeping join order of the others.
    pub fn remove(&mut self, id: &StudentId) -> Option<StudentSession> {
        self.sessions.shift_remove(id)
    }

    /// Drop the session carried by `peer_id`.
    ///
    /// A student that already reconnected elsewhere keeps its session.
    pub fn remove_peer(&mut self, peer_id: PeerId) -> Option<StudentSession> {
        let id = self.student_for_peer(peer_id)?.clone();
        self.remove(&id)
    }

    /// Remove `id` for good; the token is refused on later joins.
    pub fn kick(&mut self, id: &StudentId) -> Result<StudentSession, RosterError> {
        let session = self
            .remove(id)
            .ok_or_else(|| RosterError::NotConnected(id.clone()))?;
        self.removed.insert(id.clone());
        Ok(session)
    }

    /// Answered and total counters relative to `poll_id`.
    pub fn counts(&self, poll_id: Option<PollId>) -> AnswerCounts {
        let answered = match poll_id {
            Some(poll_id) => self
                .sessions
                .values()
                .filter(|session| session.answered && session.current_poll_id == Some(poll_id))
                .count(),
            None => 0,
        };
        AnswerCounts {
            answered,
            total: self.sessions.len(),
        }
    }

    /// Sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = &StudentSession> {
        self.sessions.values()
    }

    /// Number of connected students.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no student is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(poll_id: PollId) -> PollBinding {
        PollBinding {
            poll_id: Some(poll_id),
            answered: false,
        }
    }

    #[test]
    fn join_registers_then_rejoins() {
        let mut roster = RosterRegistry::new();
        let poll_id = Uuid::new_v4();
        let (first_peer, second_peer) = (Uuid::new_v4(), Uuid::new_v4());

        let outcome = roster
            .join("ana".into(), "Ana", first_peer, bound(poll_id))
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Registered { answered: false });

        roster.mark_answered(&"ana".into(), poll_id);
        let outcome = roster
            .join("ana".into(), "Someone else", second_peer, bound(poll_id))
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Rejoined { answered: true });

        let session = roster.session(&"ana".into()).unwrap();
        assert_eq!(session.display_name, "Ana");
        assert_eq!(session.peer_id, second_peer);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn registered_student_restores_answered_from_ledger() {
        let mut roster = RosterRegistry::new();
        let poll_id = Uuid::new_v4();
        let outcome = roster
            .join(
                "ana".into(),
                "Ana",
                Uuid::new_v4(),
                PollBinding {
                    poll_id: Some(poll_id),
                    answered: true,
                },
            )
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Registered { answered: true });
        assert_eq!(roster.has_answered(&"ana".into(), poll_id), Some(true));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut roster = RosterRegistry::new();
        let err = roster
            .join("ana".into(), "  ", Uuid::new_v4(), PollBinding::default())
            .unwrap_err();
        assert_eq!(err, RosterError::EmptyName);
        assert!(roster.is_empty());
    }

    #[test]
    fn peer_cannot_carry_two_students() {
        let mut roster = RosterRegistry::new();
        let peer = Uuid::new_v4();
        roster
            .join("ana".into(), "Ana", peer, PollBinding::default())
            .unwrap();
        let err = roster
            .join("ben".into(), "Ben", peer, PollBinding::default())
            .unwrap_err();
        assert_eq!(err, RosterError::PeerBound("ana".into()));
    }

    #[test]
    fn kicked_student_cannot_rejoin() {
        let mut roster = RosterRegistry::new();
        roster
            .join("ana".into(), "Ana", Uuid::new_v4(), PollBinding::default())
            .unwrap();
        let session = roster.kick(&"ana".into()).unwrap();
        assert_eq!(session.display_name, "Ana");

        let err = roster
            .join("ana".into(), "Ana", Uuid::new_v4(), PollBinding::default())
            .unwrap_err();
        assert_eq!(err, RosterError::Removed("ana".into()));
        assert_eq!(
            roster.kick(&"ana".into()).unwrap_err(),
            RosterError::NotConnected("ana".into())
        );
    }

    #[test]
    fn reset_clears_answered_for_everyone() {
        let mut roster = RosterRegistry::new();
        let first = Uuid::new_v4();
        for name in ["ana", "ben"] {
            roster
                .join(name.into(), name, Uuid::new_v4(), bound(first))
                .unwrap();
            roster.mark_answered(&name.into(), first);
        }
        assert_eq!(
            roster.counts(Some(first)),
            AnswerCounts {
                answered: 2,
                total: 2
            }
        );

        let second = Uuid::new_v4();
        roster.reset(second);
        assert_eq!(
            roster.counts(Some(second)),
            AnswerCounts {
                answered: 0,
                total: 2
            }
        );
        assert!(
            roster
                .iter()
                .all(|session| session.current_poll_id == Some(second))
        );
    }

    #[test]
    fn mark_answered_is_idempotent() {
        let mut roster = RosterRegistry::new();
        let poll_id = Uuid::new_v4();
        roster
            .join("ana".into(), "Ana", Uuid::new_v4(), bound(poll_id))
            .unwrap();
        assert!(roster.mark_answered(&"ana".into(), poll_id));
        assert!(!roster.mark_answered(&"ana".into(), poll_id));
        assert!(!roster.mark_answered(&"ghost".into(), poll_id));
    }

    #[test]
    fn remove_peer_ignores_students_that_moved() {
        let mut roster = RosterRegistry::new();
        let (old_peer, new_peer) = (Uuid::new_v4(), Uuid::new_v4());
        roster
            .join("ana".into(), "Ana", old_peer, PollBinding::default())
            .unwrap();
        roster
            .join("ana".into(), "Ana", new_peer, PollBinding::default())
            .unwrap();

        assert!(roster.remove_peer(old_peer).is_none());
        assert_eq!(roster.len(), 1);
        assert!(roster.remove_peer(new_peer).is_some());
        assert!(roster.is_empty());
    }

    #[test]
    fn iteration_follows_join_order() {
        let mut roster = RosterRegistry::new();
        for name in ["cid", "ana", "ben"] {
            roster
                .join(name.into(), name, Uuid::new_v4(), PollBinding::default())
                .unwrap();
        }
        roster.remove(&"ana".into());

        let names = roster
            .iter()
            .map(|session| session.display_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["cid", "ben"]);
    }
}
