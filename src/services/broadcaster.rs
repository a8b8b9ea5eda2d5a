//! Redacted projections of the session and the helpers that push them.
//!
//! Every mutation is followed by one push per affected view, issued while the session lock
//! is still held so peers observe mutations in the order they happened.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        chat::ChatMessageDto,
        poll::{AnswerCountsDto, PollSnapshot, SessionSnapshot},
        roster::{AnsweredStatusEvent, InfoMessage, RosterEntry},
        sse::{ServerEvent, SystemStatus},
        ws::{ErrorEvent, NoticeEvent},
    },
    error::ServiceError,
    state::{AppState, channel::PeerId, roster::StudentId, session::PollSession},
};

pub const POLL_STATE: &str = "poll_state";
pub const ANSWER_COUNTS: &str = "answer_counts";
pub const ROSTER: &str = "roster";
pub const CHAT_MESSAGES: &str = "chat_messages";
pub const JOINED: &str = "joined";
pub const ANSWERED_STATUS: &str = "answered_status";
pub const POLL_HISTORY: &str = "poll_history";
pub const KICKED: &str = "kicked";
pub const INFO: &str = "info";
pub const ERROR: &str = "error";
pub const NOTICE: &str = "notice";
pub const SYSTEM_STATUS: &str = "system_status";

/// Current poll as clients may see it.
pub fn poll_snapshot(session: &PollSession) -> Option<PollSnapshot> {
    session.current_poll().map(PollSnapshot::from)
}

/// Connected students in join order.
pub fn roster_entries(session: &PollSession) -> Vec<RosterEntry> {
    session.roster().iter().map(RosterEntry::from).collect()
}

/// Replayable chat window, oldest first.
pub fn chat_window(session: &PollSession) -> Vec<ChatMessageDto> {
    session.chat().window().map(ChatMessageDto::from).collect()
}

/// Poll, counters and roster in one document.
pub fn session_snapshot(session: &PollSession) -> SessionSnapshot {
    SessionSnapshot {
        poll: poll_snapshot(session),
        counts: session.counts().into(),
        roster: roster_entries(session),
    }
}

/// Events bringing a client up to date: poll, counters, roster and, for a joined student,
/// its own answered flag.
pub fn current_state_events(session: &PollSession, viewer: Option<&StudentId>) -> Vec<ServerEvent> {
    let mut events = vec![
        event(POLL_STATE, &poll_snapshot(session)),
        event(ANSWER_COUNTS, &AnswerCountsDto::from(session.counts())),
        event(ROSTER, &roster_entries(session)),
    ];

    if let (Some(student), Some(poll)) = (viewer, session.current_poll()) {
        let answered = session
            .roster()
            .has_answered(student, poll.id)
            .unwrap_or(false);
        events.push(event(ANSWERED_STATUS, &AnsweredStatusEvent { answered }));
    }

    events.into_iter().flatten().collect()
}

/// Chat window as a single event.
pub fn chat_event(session: &PollSession) -> Option<ServerEvent> {
    event(CHAT_MESSAGES, &chat_window(session))
}

/// Push the current poll to everyone.
pub fn broadcast_poll_state(state: &AppState, session: &PollSession) {
    publish(state, POLL_STATE, &poll_snapshot(session));
}

/// Push answered/total counters to everyone.
pub fn broadcast_counts(state: &AppState, session: &PollSession) {
    publish(
        state,
        ANSWER_COUNTS,
        &AnswerCountsDto::from(session.counts()),
    );
}

/// Push the roster to everyone.
pub fn broadcast_roster(state: &AppState, session: &PollSession) {
    publish(state, ROSTER, &roster_entries(session));
}

/// Push the chat window to everyone.
pub fn broadcast_chat(state: &AppState, session: &PollSession) {
    publish(state, CHAT_MESSAGES, &chat_window(session));
}

/// Push a human-readable announcement to everyone.
pub fn broadcast_info(state: &AppState, message: &InfoMessage) {
    publish(state, INFO, message);
}

/// Announce entering or leaving degraded mode.
pub fn broadcast_system_status(state: &AppState, degraded: bool) {
    publish(state, SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Queue a named event for a single peer.
pub fn send_to_peer<T>(state: &AppState, peer_id: PeerId, name: &str, payload: &T)
where
    T: ?Sized + Serialize,
{
    if let Some(event) = event(name, payload) {
        state.peers().send_to(peer_id, event);
    }
}

/// Report a refused command to its originator.
pub fn send_error(state: &AppState, peer_id: PeerId, err: &ServiceError) {
    send_to_peer(
        state,
        peer_id,
        ERROR,
        &ErrorEvent {
            kind: err.kind(),
            message: err.to_string(),
        },
    );
}

/// Tell the originator of a write that it was not persisted.
pub fn send_notice(state: &AppState, peer_id: PeerId, err: &ServiceError) {
    send_to_peer(
        state,
        peer_id,
        NOTICE,
        &NoticeEvent {
            kind: err.kind(),
            message: format!("poll history was not saved: {err}"),
        },
    );
}

fn publish<T>(state: &AppState, name: &str, payload: &T)
where
    T: ?Sized + Serialize,
{
    if let Some(event) = event(name, payload) {
        state.peers().broadcast(&event);
        state.observers().publish(event);
    }
}

fn event<T>(name: &str, payload: &T) -> Option<ServerEvent>
where
    T: ?Sized + Serialize,
{
    match ServerEvent::json(name, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize event payload");
            None
        }
    }
}
