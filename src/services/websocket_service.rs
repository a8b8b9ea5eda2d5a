use std::ops::ControlFlow;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{broadcaster, session_service},
    state::{
        SharedState,
        channel::{PeerConnection, PeerFrame, PeerId},
        roster::StudentId,
    },
};

/// Per-connection failures, kept apart from the command-level [`ServiceError`].
#[derive(Debug, Error)]
enum SocketError {
    /// Ballot names a student other than the one this connection joined as.
    #[error("ballot ignored: connection joined as `{joined}`, got `{got}`")]
    MismatchedStudent { joined: StudentId, got: StudentId },
    /// Ballot sent before any join.
    #[error("ballot ignored: connection has not joined")]
    NotJoined,
    /// Refused by the session.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of a classroom WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<PeerFrame>();
    let peer_id = Uuid::new_v4();

    // Dropped when the writer exits, so the reader stops as soon as the socket is severed.
    let (writer_done_tx, mut writer_done) = oneshot::channel::<()>();

    // Dedicated writer task keeps outbound events flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        let _writer_done = writer_done_tx;
        while let Some(frame) = outbound_rx.recv().await {
            let message = match frame {
                PeerFrame::Event(event) => Message::Text(event.to_envelope().into()),
                PeerFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    session_service::peer_connected(
        &state,
        PeerConnection {
            id: peer_id,
            tx: outbound_tx.clone(),
        },
    )
    .await;

    let mut joined: Option<StudentId> = None;

    loop {
        let message = tokio::select! {
            _ = &mut writer_done => {
                info!(peer_id = %peer_id, "writer closed; no longer reading from peer");
                break;
            }
            message = receiver.next() => message,
        };
        let Some(message) = message else {
            break;
        };

        match message {
            Ok(Message::Text(text)) => {
                if handle_text(&state, peer_id, &mut joined, &text)
                    .await
                    .is_break()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(peer_id = %peer_id, "peer closed connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Err(err) => {
                warn!(peer_id = %peer_id, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::peer_disconnected(&state, peer_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Parse and run one client frame. Breaks once the peer is no longer routed (kicked).
async fn handle_text(
    state: &SharedState,
    peer_id: PeerId,
    joined: &mut Option<StudentId>,
    text: &str,
) -> ControlFlow<()> {
    if !state.peers().contains(peer_id) {
        debug!(peer_id = %peer_id, "dropping frame from severed peer");
        return ControlFlow::Break(());
    }

    debug!(peer_id = %peer_id, payload = %text, "received client message");
    let command = match ClientMessage::from_json_str(text) {
        Ok(command) => command,
        Err(err) => {
            warn!(peer_id = %peer_id, error = %err, "failed to parse or validate client message");
            broadcaster::send_error(state, peer_id, &ServiceError::from(err));
            return ControlFlow::Continue(());
        }
    };

    match dispatch(state, peer_id, joined, command).await {
        Ok(()) => {}
        Err(SocketError::Service(err)) => {
            warn!(peer_id = %peer_id, error = %err, "command refused");
            broadcaster::send_error(state, peer_id, &err);
        }
        Err(err) => warn!(peer_id = %peer_id, error = %err, "command ignored"),
    }
    ControlFlow::Continue(())
}

async fn dispatch(
    state: &SharedState,
    peer_id: PeerId,
    joined: &mut Option<StudentId>,
    command: ClientMessage,
) -> Result<(), SocketError> {
    match command {
        ClientMessage::Join { student_id, name } => {
            let event = session_service::join(state, peer_id, student_id, &name).await?;
            *joined = Some(event.student_id);
        }
        ClientMessage::CreatePoll(request) => {
            session_service::create_poll(state, request.into(), Some(peer_id)).await?;
        }
        ClientMessage::SubmitVote {
            poll_id,
            option_id,
            student_id,
        } => {
            let student = ballot_identity(joined.as_ref(), student_id)?;
            session_service::submit_vote(state, poll_id, option_id, &student, Some(peer_id)).await;
        }
        ClientMessage::Timeout {
            poll_id,
            student_id,
        } => {
            let student = ballot_identity(joined.as_ref(), student_id)?;
            session_service::record_timeout(state, poll_id, &student).await;
        }
        ClientMessage::EndPoll { poll_id } => {
            session_service::end_poll(state, poll_id, Some(peer_id)).await?;
        }
        ClientMessage::Kick { student_id } => {
            session_service::kick(state, &student_id).await?;
        }
        ClientMessage::ChatSend(payload) => {
            session_service::post_chat(state, payload.into()).await?;
        }
        ClientMessage::RequestCurrentState => {
            session_service::send_current_state(state, peer_id, joined.as_ref()).await;
        }
        ClientMessage::RequestPollHistory => {
            session_service::send_poll_history(state, peer_id).await?;
        }
        ClientMessage::RequestChatHistory => {
            session_service::send_chat_history(state, peer_id).await;
        }
    }
    Ok(())
}

/// Resolve which student a ballot speaks for: the joined identity, which a supplied id
/// must match.
fn ballot_identity(
    joined: Option<&StudentId>,
    claimed: Option<StudentId>,
) -> Result<StudentId, SocketError> {
    let joined = joined.ok_or(SocketError::NotJoined)?;
    match claimed {
        Some(got) if got != *joined => Err(SocketError::MismatchedStudent {
            joined: joined.clone(),
            got,
        }),
        _ => Ok(joined.clone()),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<PeerFrame>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn ballots_speak_for_the_joined_student() {
        let ana = StudentId::from("ana");
        assert_eq!(ballot_identity(Some(&ana), None).unwrap(), ana);
        assert_eq!(
            ballot_identity(Some(&ana), Some("ana".into())).unwrap(),
            ana
        );
        assert!(matches!(
            ballot_identity(Some(&ana), Some("ben".into())),
            Err(SocketError::MismatchedStudent { .. })
        ));
        assert!(matches!(
            ballot_identity(None, Some("ana".into())),
            Err(SocketError::NotJoined)
        ));
    }

    #[tokio::test]
    async fn kicked_peer_frames_are_not_processed() {
        let state = AppState::new(AppConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let peer_id = Uuid::new_v4();
        session_service::peer_connected(
            &state,
            PeerConnection {
                id: peer_id,
                tx,
            },
        )
        .await;

        let mut joined = None;
        let flow = handle_text(
            &state,
            peer_id,
            &mut joined,
            r#"{"type":"join","name":"Ana"}"#,
        )
        .await;
        assert!(flow.is_continue());
        let ana = joined.clone().unwrap();

        session_service::kick(&state, &ana).await.unwrap();
        while rx.try_recv().is_ok() {}

        let flow = handle_text(
            &state,
            peer_id,
            &mut joined,
            r#"{"type":"join","name":"Eve"}"#,
        )
        .await;
        assert!(flow.is_break());
        let flow = handle_text(
            &state,
            peer_id,
            &mut joined,
            r#"{"type":"chat_send","sender_id":"eve","sender_name":"Eve","text":"still here"}"#,
        )
        .await;
        assert!(flow.is_break());

        let session = state.session().lock().await;
        assert!(session.roster().is_empty());
        assert!(session.chat().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
