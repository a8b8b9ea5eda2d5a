//! Commands against the live classroom session.
//!
//! Each command locks the session, mutates it, queues persistence and pushes the resulting
//! views before releasing the lock.

use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::{
    dao::models::{PollEntity, PollOutcomeEntity, option_entities},
    dto::{
        poll::{PollHistoryItem, PollSnapshot, SessionSnapshot},
        roster::{AnsweredStatusEvent, InfoKind, InfoMessage, JoinedEvent, KickedEvent},
    },
    error::ServiceError,
    services::{
        broadcaster,
        deadline::{self, PendingDeadline},
        persistence::PersistJob,
    },
    state::{
        AppState, SharedState,
        channel::{PeerConnection, PeerId},
        chat::NewChatMessage,
        poll::{BallotOutcome, PollDraft, PollId},
        roster::{JoinOutcome, StudentId},
        session::PollSession,
    },
};

/// Register a new connection and bring it up to date.
///
/// Registration happens under the session lock so the peer sees every broadcast issued
/// after its initial state.
pub async fn peer_connected(state: &SharedState, connection: PeerConnection) {
    let peer_id = connection.id;
    let session = state.session().lock().await;
    state.peers().register(connection);
    for event in broadcaster::current_state_events(&session, None) {
        state.peers().send_to(peer_id, event);
    }
    if let Some(event) = broadcaster::chat_event(&session) {
        state.peers().send_to(peer_id, event);
    }
    info!(peer_id = %peer_id, peers = state.peers().len(), "peer connected");
}

/// Forget a closed connection and the student it carried.
pub async fn peer_disconnected(state: &SharedState, peer_id: PeerId) {
    let mut session = state.session().lock().await;
    state.peers().unregister(peer_id);

    match session.leave(peer_id) {
        Some(student) => {
            info!(peer_id = %peer_id, student_id = %student.id, "student left");
            broadcaster::broadcast_roster(state, &session);
            broadcaster::broadcast_counts(state, &session);
            broadcaster::broadcast_poll_state(state, &session);
        }
        None => debug!(peer_id = %peer_id, "peer disconnected"),
    }
}

/// Put the student on the roster, issuing a token when none is supplied.
///
/// A rejoin keeps the name the student first registered with.
pub async fn join(
    state: &SharedState,
    peer_id: PeerId,
    requested: Option<StudentId>,
    name: &str,
) -> Result<JoinedEvent, ServiceError> {
    let mut session = state.session().lock().await;
    // a kicked or closed connection is no longer routed and must not re-enter the roster
    if !state.peers().contains(peer_id) {
        return Err(ServiceError::Conflict(
            "connection is no longer registered".to_string(),
        ));
    }
    let (student_id, outcome) = session.join(requested, name, peer_id)?;

    let name = session
        .roster()
        .session(&student_id)
        .map(|student| student.display_name.clone())
        .unwrap_or_else(|| name.trim().to_string());
    let joined = JoinedEvent {
        student_id: student_id.clone(),
        name,
        answered: outcome.answered(),
    };
    broadcaster::send_to_peer(state, peer_id, broadcaster::JOINED, &joined);

    match outcome {
        JoinOutcome::Registered { answered } => {
            info!(student_id = %student_id, peer_id = %peer_id, answered, "student joined");
            broadcaster::broadcast_roster(state, &session);
            broadcaster::broadcast_counts(state, &session);
            broadcaster::broadcast_poll_state(state, &session);
        }
        JoinOutcome::Rejoined { answered } => {
            debug!(student_id = %student_id, answered, "student rejoined");
            broadcaster::send_to_peer(
                state,
                peer_id,
                broadcaster::ANSWERED_STATUS,
                &AnsweredStatusEvent { answered },
            );
        }
    }

    Ok(joined)
}

/// Start a poll, arm its deadline and announce it.
pub async fn create_poll(
    state: &SharedState,
    draft: PollDraft,
    origin: Option<PeerId>,
) -> Result<PollSnapshot, ServiceError> {
    let mut session = state.session().lock().await;
    let poll = session.create_poll(draft, SystemTime::now())?;
    let poll_id = poll.id;
    let max_time_seconds = poll.max_time_seconds;
    let record = PollEntity::from(poll);
    let snapshot = PollSnapshot::from(poll);

    {
        let mut slot = state.deadline_slot().lock().await;
        deadline::schedule(state, &mut slot, poll_id, max_time_seconds);
    }

    state
        .persistence()
        .enqueue(PersistJob::Create(record), origin);
    broadcaster::broadcast_poll_state(state, &session);
    broadcaster::broadcast_counts(state, &session);

    info!(
        poll_id = %poll_id,
        options = snapshot.options.len(),
        max_time_seconds,
        "poll created"
    );
    Ok(snapshot)
}

/// Tally a ballot. Stale, late and duplicate ballots are dropped without an error.
pub async fn submit_vote(
    state: &SharedState,
    poll_id: PollId,
    option_id: u8,
    student: &StudentId,
    origin: Option<PeerId>,
) -> BallotOutcome {
    let mut session = state.session().lock().await;
    let outcome = session.submit_vote(poll_id, option_id, student, SystemTime::now());

    match outcome {
        BallotOutcome::Counted { option_id, correct } => {
            if let Some(poll) = session.current_poll() {
                state.persistence().enqueue(
                    PersistJob::UpdateOptions {
                        poll_id,
                        options: option_entities(poll),
                    },
                    origin,
                );
            }
            debug!(poll_id = %poll_id, student_id = %student, option_id, correct, "ballot counted");
            broadcaster::broadcast_poll_state(state, &session);
            broadcaster::broadcast_counts(state, &session);
            notify_answered(state, &session, student);
        }
        BallotOutcome::Ignored(reason) => {
            debug!(poll_id = %poll_id, student_id = %student, ?reason, "ballot ignored");
        }
        BallotOutcome::TimedOut => {}
    }
    outcome
}

/// Mark a student as out of time on the active poll.
pub async fn record_timeout(
    state: &SharedState,
    poll_id: PollId,
    student: &StudentId,
) -> BallotOutcome {
    let mut session = state.session().lock().await;
    let outcome = session.record_timeout(poll_id, student);

    if outcome.is_applied() {
        debug!(poll_id = %poll_id, student_id = %student, "student timed out");
        broadcaster::broadcast_counts(state, &session);
        notify_answered(state, &session, student);
    } else {
        debug!(poll_id = %poll_id, student_id = %student, ?outcome, "timeout ignored");
    }
    outcome
}

/// Close the current poll on request.
pub async fn end_poll(
    state: &SharedState,
    poll_id: PollId,
    origin: Option<PeerId>,
) -> Result<PollSnapshot, ServiceError> {
    let mut session = state.session().lock().await;
    let mut slot = state.deadline_slot().lock().await;
    finish_poll(state, &mut session, &mut slot, poll_id, origin)
}

/// Deadline handler: time out whoever is still pending, then close the poll if configured.
pub async fn expire_poll(state: &SharedState, poll_id: PollId) {
    let mut session = state.session().lock().await;
    let mut slot = state.deadline_slot().lock().await;
    deadline::release(&mut slot, poll_id);

    if session.active_poll_id() != Some(poll_id) {
        debug!(poll_id = %poll_id, "deadline fired for a poll that is no longer active");
        return;
    }

    let timed_out = session.expire_deadline(poll_id);
    info!(poll_id = %poll_id, timed_out = timed_out.len(), "poll deadline reached");
    if !timed_out.is_empty() {
        broadcaster::broadcast_counts(state, &session);
        for student in &timed_out {
            notify_answered(state, &session, student);
        }
    }

    if state.config().auto_end_on_deadline() {
        if let Err(err) = finish_poll(state, &mut session, &mut slot, poll_id, None) {
            warn!(poll_id = %poll_id, error = %err, "failed to end poll at deadline");
        }
    }
}

fn finish_poll(
    state: &AppState,
    session: &mut PollSession,
    slot: &mut Option<PendingDeadline>,
    poll_id: PollId,
    origin: Option<PeerId>,
) -> Result<PollSnapshot, ServiceError> {
    let now = SystemTime::now();
    let poll = session.end_poll(poll_id, now)?;
    let outcome = PollOutcomeEntity {
        ended_at: poll.ended_at.unwrap_or(now),
        options: option_entities(poll),
        correct_answers_count: poll.correct_answers_count,
    };
    let snapshot = PollSnapshot::from(poll);

    deadline::cancel(slot, poll_id);
    state
        .persistence()
        .enqueue(PersistJob::Finalize { poll_id, outcome }, origin);
    broadcaster::broadcast_poll_state(state, session);
    broadcaster::broadcast_counts(state, session);

    info!(
        poll_id = %poll_id,
        total_votes = snapshot.total_votes,
        correct = snapshot.correct_answers_count.unwrap_or_default(),
        "poll ended"
    );
    Ok(snapshot)
}

/// Remove a student for good and sever its connection.
pub async fn kick(state: &SharedState, student: &StudentId) -> Result<(), ServiceError> {
    let mut session = state.session().lock().await;
    let removed = session.kick(student)?;

    broadcaster::send_to_peer(
        state,
        removed.peer_id,
        broadcaster::KICKED,
        &KickedEvent {
            message: "You have been removed from the session by the teacher.".into(),
        },
    );
    state.peers().disconnect(removed.peer_id);

    broadcaster::broadcast_roster(state, &session);
    broadcaster::broadcast_counts(state, &session);
    broadcaster::broadcast_poll_state(state, &session);
    broadcaster::broadcast_info(
        state,
        &InfoMessage {
            kind: InfoKind::StudentRemoved,
            content: format!("{} has been removed by the teacher.", removed.display_name),
        },
    );

    info!(student_id = %removed.id, name = %removed.display_name, "student kicked");
    Ok(())
}

/// Append a chat message and push the window to everyone.
pub async fn post_chat(state: &SharedState, message: NewChatMessage) -> Result<(), ServiceError> {
    let mut session = state.session().lock().await;
    let posted = session.post_chat(message, SystemTime::now())?;
    debug!(sender_id = %posted.sender_id, "chat message posted");
    broadcaster::broadcast_chat(state, &session);
    Ok(())
}

/// Re-send poll, counters, roster and the viewer's answered flag to one peer.
pub async fn send_current_state(state: &SharedState, peer_id: PeerId, viewer: Option<&StudentId>) {
    let session = state.session().lock().await;
    for event in broadcaster::current_state_events(&session, viewer) {
        state.peers().send_to(peer_id, event);
    }
}

/// Re-send the chat window to one peer.
pub async fn send_chat_history(state: &SharedState, peer_id: PeerId) {
    let session = state.session().lock().await;
    if let Some(event) = broadcaster::chat_event(&session) {
        state.peers().send_to(peer_id, event);
    }
}

/// Ended polls, newest first. `limit` is capped by the configured history size.
pub async fn poll_history(
    state: &AppState,
    limit: Option<usize>,
) -> Result<Vec<PollHistoryItem>, ServiceError> {
    let cap = state.config().history_limit();
    let limit = limit.map_or(cap, |limit| limit.clamp(1, cap));
    let store = state.require_poll_store().await?;
    let polls = store.list_ended(limit).await?;
    Ok(polls.into_iter().map(PollHistoryItem::from).collect())
}

/// Send the poll history to one peer.
pub async fn send_poll_history(state: &SharedState, peer_id: PeerId) -> Result<(), ServiceError> {
    let history = poll_history(state, None).await?;
    broadcaster::send_to_peer(state, peer_id, broadcaster::POLL_HISTORY, &history);
    Ok(())
}

/// Redacted view of the whole session.
pub async fn current_snapshot(state: &AppState) -> SessionSnapshot {
    let session = state.session().lock().await;
    broadcaster::session_snapshot(&session)
}

fn notify_answered(state: &AppState, session: &PollSession, student: &StudentId) {
    let Some(entry) = session.roster().session(student) else {
        return;
    };
    broadcaster::send_to_peer(
        state,
        entry.peer_id,
        broadcaster::ANSWERED_STATUS,
        &AnsweredStatusEvent {
            answered: entry.answered,
        },
    );
}
