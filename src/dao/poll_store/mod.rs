pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{PollEntity, PollOptionEntity, PollOutcomeEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::InMemoryPollStore;

/// Durable history of polls.
///
/// Writes for one poll arrive in creation, update, finalize order; backends do not need to
/// reorder them.
pub trait PollStore: Send + Sync {
    /// Record a freshly created poll.
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite the option tallies of a recorded poll.
    fn update_options(
        &self,
        id: Uuid,
        options: Vec<PollOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Mark a recorded poll as ended with its final figures.
    fn finalize_ended(
        &self,
        id: Uuid,
        outcome: PollOutcomeEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Ended polls, most recently ended first.
    fn list_ended(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
