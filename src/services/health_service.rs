use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage health alongside live session figures, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_poll_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "poll store health check failed");
            }
        }
        Err(_) => warn!("poll store unavailable (degraded mode)"),
    }

    let active_poll_id = state.session().lock().await.active_poll_id();
    HealthResponse::new(state.is_degraded(), state.peers().len(), active_poll_id)
}
