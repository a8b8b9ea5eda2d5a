/// Database model definitions.
pub mod models;
/// Durable poll history backends.
pub mod poll_store;
/// Storage abstraction layer for database operations.
pub mod storage;
