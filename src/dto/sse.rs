use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Named event pushed to WebSocket peers and SSE observers.
pub struct ServerEvent {
    pub event: String,
    /// JSON-encoded payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<String>,
        T: Serialize + ?Sized,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Frame used on WebSocket connections: `{"event": <name>, "data": <payload>}`.
    pub fn to_envelope(&self) -> String {
        // The event name is a plain identifier and `data` is already valid JSON.
        format!(r#"{{"event":"{}","data":{}}}"#, self.event, self.data)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
