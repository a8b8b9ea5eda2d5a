/// Redacted projections of the session and the helpers that push them.
pub mod broadcaster;
/// Server-owned poll deadline timer.
pub mod deadline;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Background writer for poll history.
pub mod persistence;
/// Commands against the live classroom session.
pub mod session_service;
/// Server-Sent Events observer stream.
pub mod sse_service;
/// Poll store connection supervisor.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
