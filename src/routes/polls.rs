use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::poll::{HistoryQuery, PollHistoryItem, SessionSnapshot},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Read-only poll endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/polls/current", get(get_current))
        .route("/polls/history", get(get_history))
}

#[utoipa::path(
    get,
    path = "/polls/current",
    tag = "polls",
    responses((status = 200, description = "Current poll, counters and roster", body = SessionSnapshot))
)]
/// Return the redacted state of the classroom.
pub async fn get_current(State(state): State<SharedState>) -> Json<SessionSnapshot> {
    Json(session_service::current_snapshot(&state).await)
}

#[utoipa::path(
    get,
    path = "/polls/history",
    tag = "polls",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Ended polls, newest first", body = [PollHistoryItem]),
        (status = 503, description = "Poll store unavailable")
    )
)]
/// Return the most recently ended polls.
pub async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PollHistoryItem>>, AppError> {
    Ok(Json(
        session_service::poll_history(&state, query.limit).await?,
    ))
}
