use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::models::{PollEntity, PollOptionEntity, PollOutcomeEntity},
    error::ServiceError,
    services::broadcaster,
    state::{AppState, channel::PeerId},
};

/// A write to the poll history.
#[derive(Debug, Clone)]
pub enum PersistJob {
    Create(PollEntity),
    UpdateOptions {
        poll_id: Uuid,
        options: Vec<PollOptionEntity>,
    },
    Finalize {
        poll_id: Uuid,
        outcome: PollOutcomeEntity,
    },
}

impl PersistJob {
    fn poll_id(&self) -> Uuid {
        match self {
            PersistJob::Create(poll) => poll.id,
            PersistJob::UpdateOptions { poll_id, .. } | PersistJob::Finalize { poll_id, .. } => {
                *poll_id
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PersistJob::Create(_) => "create",
            PersistJob::UpdateOptions { .. } => "update_options",
            PersistJob::Finalize { .. } => "finalize",
        }
    }
}

enum QueueMessage {
    Job {
        job: PersistJob,
        origin: Option<PeerId>,
    },
    Barrier(oneshot::Sender<()>),
}

/// FIFO of history writes executed by a single background task.
///
/// Jobs run one at a time in submission order. A failed job is logged and reported to the
/// peer that caused it; it is never retried and the live session is left untouched.
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl PersistenceQueue {
    /// Start the worker. It stops once the owning state is dropped.
    pub fn spawn(state: Weak<AppState>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(state, rx));
        Self { tx }
    }

    /// Queue a job; `origin` receives a notice if it fails.
    pub fn enqueue(&self, job: PersistJob, origin: Option<PeerId>) {
        if self.tx.send(QueueMessage::Job { job, origin }).is_err() {
            warn!("persistence worker stopped; dropping job");
        }
    }

    /// Wait until every job queued before this call has been attempted.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(QueueMessage::Barrier(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(state: Weak<AppState>, mut rx: mpsc::UnboundedReceiver<QueueMessage>) {
    while let Some(message) = rx.recv().await {
        match message {
            QueueMessage::Barrier(done) => {
                let _ = done.send(());
            }
            QueueMessage::Job { job, origin } => {
                let Some(state) = state.upgrade() else {
                    break;
                };
                let poll_id = job.poll_id();
                let label = job.label();
                match execute(&state, job).await {
                    Ok(()) => debug!(poll_id = %poll_id, job = label, "poll history updated"),
                    Err(err) => {
                        warn!(poll_id = %poll_id, job = label, error = %err, "failed to persist poll");
                        if let Some(peer_id) = origin {
                            broadcaster::send_notice(&state, peer_id, &err);
                        }
                    }
                }
            }
        }
    }
    debug!("persistence worker stopped");
}

async fn execute(state: &AppState, job: PersistJob) -> Result<(), ServiceError> {
    let store = state.require_poll_store().await?;
    match job {
        PersistJob::Create(poll) => store.create_record(poll).await?,
        PersistJob::UpdateOptions { poll_id, options } => {
            store.update_options(poll_id, options).await?
        }
        PersistJob::Finalize { poll_id, outcome } => store.finalize_ended(poll_id, outcome).await?,
    }
    Ok(())
}
