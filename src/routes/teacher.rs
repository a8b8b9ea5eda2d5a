use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::poll::{CreatePollRequest, PollSnapshot},
    error::AppError,
    services::session_service,
    state::{SharedState, roster::StudentId},
};

/// REST mirrors of the teacher commands available on the WebSocket.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/teacher/polls", post(create_poll))
        .route("/teacher/polls/{id}/end", post(end_poll))
        .route("/teacher/students/{id}/kick", post(kick_student))
}

#[utoipa::path(
    post,
    path = "/teacher/polls",
    tag = "teacher",
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Poll started", body = PollSnapshot),
        (status = 400, description = "Invalid poll"),
        (status = 409, description = "Another poll is still active")
    )
)]
/// Start a new poll.
pub async fn create_poll(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreatePollRequest>>,
) -> Result<(StatusCode, Json<PollSnapshot>), AppError> {
    let poll = session_service::create_poll(&state, payload.into(), None).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

#[utoipa::path(
    post,
    path = "/teacher/polls/{id}/end",
    tag = "teacher",
    params(("id" = Uuid, Path, description = "Identifier of the current poll")),
    responses(
        (status = 200, description = "Poll ended", body = PollSnapshot),
        (status = 409, description = "Poll is not current or already ended")
    )
)]
/// End the current poll.
pub async fn end_poll(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PollSnapshot>, AppError> {
    Ok(Json(session_service::end_poll(&state, id, None).await?))
}

#[utoipa::path(
    post,
    path = "/teacher/students/{id}/kick",
    tag = "teacher",
    params(("id" = String, Path, description = "Student token")),
    responses(
        (status = 204, description = "Student removed"),
        (status = 404, description = "Student not connected")
    )
)]
/// Remove a student from the session and close its connection.
pub async fn kick_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    session_service::kick(&state, &StudentId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
