use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::ServerEvent,
    services::broadcaster,
    state::SharedState,
};

/// Subscribe to the observer stream along with the events that describe the current state.
///
/// Both are taken under the session lock so no broadcast falls between them.
pub async fn subscribe_public(
    state: &SharedState,
) -> (Vec<ServerEvent>, broadcast::Receiver<ServerEvent>) {
    let session = state.session().lock().await;
    let receiver = state.observers().subscribe();
    let mut initial = broadcaster::current_state_events(&session, None);
    initial.extend(broadcaster::chat_event(&session));
    (initial, receiver)
}

/// Convert a broadcast receiver into an SSE response, replaying `initial` first.
pub fn to_sse_stream(
    initial: Vec<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "observer lagging; dropped events");
                        }
                    }
                }
            }
        }

        info!("observer stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    Event::default().event(payload.event).data(payload.data)
}
