use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{poll_store::PollStore, storage::StorageError},
    services::broadcaster,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the poll store and keep the shared state in degraded mode while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn PollStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_poll_store(store.clone()).await;
                info!("poll store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;
                state.clear_poll_store().await;

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "poll store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll the store until it fails and cannot be brought back.
async fn watch_health(state: &SharedState, store: &dyn PollStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("poll store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "poll store health check failed");
                if !reconnect(state, store).await {
                    warn!("exhausted poll store reconnect attempts; staying in degraded mode");
                    return;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn PollStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "poll store reconnected after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "poll store reconnect failed; entering degraded mode");
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "poll store reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

/// Push a `system_status` event to every client whenever degraded mode toggles.
pub async fn announce_status_changes(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "storage status changed");
        broadcaster::broadcast_system_status(&state, degraded);
    }
}
