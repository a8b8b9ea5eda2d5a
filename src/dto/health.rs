use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of open WebSocket connections.
    pub connected_peers: usize,
    /// Poll currently accepting ballots, if any.
    pub active_poll_id: Option<Uuid>,
}

impl HealthResponse {
    /// Build a response from the storage flag and live session figures.
    pub fn new(degraded: bool, connected_peers: usize, active_poll_id: Option<Uuid>) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_string(),
            connected_peers,
            active_poll_id,
        }
    }
}
