use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::ws::{ClientMessageError, ErrorKind},
    state::{
        chat::ChatError,
        poll::{CreatePollError, EndPollError},
        roster::RosterError,
    },
};

/// Errors returned by session commands.
///
/// Everything but [`ServiceError::Persistence`] and [`ServiceError::Degraded`] is raised
/// before any state changes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The command does not fit the current lifecycle state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The targeted entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The storage backend refused a write or read.
    #[error("storage failure")]
    Persistence(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
}

impl ServiceError {
    /// Category reported to WebSocket clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Persistence(_) => ErrorKind::Persistence,
            ServiceError::Degraded => ErrorKind::Degraded,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Persistence(err)
    }
}

impl From<CreatePollError> for ServiceError {
    fn from(err: CreatePollError) -> Self {
        match err {
            CreatePollError::AlreadyActive { .. } => ServiceError::Conflict(err.to_string()),
            CreatePollError::Invalid(invalid) => ServiceError::Validation(invalid.to_string()),
        }
    }
}

impl From<EndPollError> for ServiceError {
    fn from(err: EndPollError) -> Self {
        ServiceError::Conflict(err.to_string())
    }
}

impl From<RosterError> for ServiceError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::EmptyName => ServiceError::Validation(err.to_string()),
            RosterError::NotConnected(_) => ServiceError::NotFound(err.to_string()),
            RosterError::Removed(_) | RosterError::PeerBound(_) => {
                ServiceError::Conflict(err.to_string())
            }
        }
    }
}

impl From<ChatError> for ServiceError {
    fn from(err: ChatError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ClientMessageError> for ServiceError {
    fn from(err: ClientMessageError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Persistence(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
