use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};
use tracing::debug;

use crate::{
    services::session_service,
    state::{SharedState, poll::PollId},
};

/// Timer owned by the server for the active poll.
pub struct PendingDeadline {
    poll_id: PollId,
    handle: JoinHandle<()>,
}

impl PendingDeadline {
    /// Poll the timer belongs to.
    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }
}

/// Arm the timer for `poll_id`, replacing whatever was armed before.
///
/// Fires after the answer window plus the configured grace period.
pub fn schedule(
    state: &SharedState,
    slot: &mut Option<PendingDeadline>,
    poll_id: PollId,
    max_time_seconds: u32,
) {
    let delay = Duration::from_secs(u64::from(max_time_seconds)) + state.config().deadline_grace();
    let weak = Arc::downgrade(state);
    let handle = tokio::spawn(async move {
        sleep(delay).await;
        if let Some(state) = weak.upgrade() {
            session_service::expire_poll(&state, poll_id).await;
        }
    });

    if let Some(previous) = slot.replace(PendingDeadline { poll_id, handle }) {
        debug!(poll_id = %previous.poll_id, "replacing armed deadline");
        previous.handle.abort();
    }
}

/// Disarm the timer of `poll_id`. Returns whether one was pending.
pub fn cancel(slot: &mut Option<PendingDeadline>, poll_id: PollId) -> bool {
    match take_matching(slot, poll_id) {
        Some(pending) => {
            pending.handle.abort();
            true
        }
        None => false,
    }
}

/// Forget the timer of `poll_id` without aborting it; used by the timer task itself.
pub fn release(slot: &mut Option<PendingDeadline>, poll_id: PollId) {
    take_matching(slot, poll_id);
}

fn take_matching(slot: &mut Option<PendingDeadline>, poll_id: PollId) -> Option<PendingDeadline> {
    if slot.as_ref().is_some_and(|pending| pending.poll_id == poll_id) {
        slot.take()
    } else {
        None
    }
}
