use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the classroom poll backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::polls::get_current,
        crate::routes::polls::get_history,
        crate::routes::teacher::create_poll,
        crate::routes::teacher::end_poll,
        crate::routes::teacher::kick_student,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::poll::CreatePollRequest,
            crate::dto::poll::PollSnapshot,
            crate::dto::poll::PollOptionSnapshot,
            crate::dto::poll::PollStatusDto,
            crate::dto::poll::AnswerCountsDto,
            crate::dto::poll::PollHistoryItem,
            crate::dto::poll::SessionSnapshot,
            crate::dto::roster::RosterEntry,
            crate::dto::roster::JoinedEvent,
            crate::dto::roster::AnsweredStatusEvent,
            crate::dto::roster::KickedEvent,
            crate::dto::roster::InfoKind,
            crate::dto::roster::InfoMessage,
            crate::dto::chat::ChatMessageDto,
            crate::dto::ws::ErrorKind,
            crate::dto::ws::ErrorEvent,
            crate::dto::ws::NoticeEvent,
            crate::dto::sse::SystemStatus,
            crate::state::roster::StudentId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "classroom", description = "WebSocket channel shared by the teacher and students"),
        (name = "polls", description = "Read-only poll state and history"),
        (name = "teacher", description = "Teacher commands over REST"),
    )
)]
pub struct ApiDoc;
