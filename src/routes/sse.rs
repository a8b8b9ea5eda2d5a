use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Read-only stream of every classroom broadcast", content_type = "text/event-stream", body = String))
)]
/// Stream the classroom to read-only observers such as a projector display.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (initial, receiver) = sse_service::subscribe_public(&state).await;
    info!(
        observers = state.observers().observer_count(),
        "new public SSE connection"
    );
    sse_service::to_sse_stream(initial, receiver)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/public", get(public_stream))
}
