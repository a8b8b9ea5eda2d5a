pub mod channel;
pub mod chat;
pub mod poll;
pub mod roster;
pub mod session;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::poll_store::PollStore,
    error::ServiceError,
    services::{deadline::PendingDeadline, persistence::PersistenceQueue},
};

use self::{
    channel::{ObserverHub, PeerRegistry},
    session::PollSession,
};

pub type SharedState = Arc<AppState>;

/// Central application state: the live session, connections and storage handle.
pub struct AppState {
    config: Arc<AppConfig>,
    poll_store: RwLock<Option<Arc<dyn PollStore>>>,
    observers: ObserverHub,
    peers: PeerRegistry,
    session: Mutex<PollSession>,
    deadline: Mutex<Option<PendingDeadline>>,
    persistence: PersistenceQueue,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    /// Must be called from within a Tokio runtime: the persistence worker is spawned here.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new_cyclic(|weak| Self {
            poll_store: RwLock::new(None),
            observers: ObserverHub::new(config.observer_capacity()),
            peers: PeerRegistry::new(),
            session: Mutex::new(PollSession::new(
                config.chat_window(),
                config.deadline_grace(),
            )),
            deadline: Mutex::new(None),
            persistence: PersistenceQueue::spawn(weak.clone()),
            degraded: degraded_tx,
            config: Arc::new(config),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Obtain a handle to the current poll store, if one is installed.
    pub async fn poll_store(&self) -> Option<Arc<dyn PollStore>> {
        let guard = self.poll_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current poll store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_poll_store(&self) -> Result<Arc<dyn PollStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.poll_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new poll store implementation and leave degraded mode.
    pub async fn install_poll_store(&self, store: Arc<dyn PollStore>) {
        {
            let mut guard = self.poll_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current poll store and enter degraded mode.
    pub async fn clear_poll_store(&self) {
        {
            let mut guard = self.poll_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and notify the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Fan-out used for the public SSE stream.
    pub fn observers(&self) -> &ObserverHub {
        &self.observers
    }

    /// Registry of open WebSocket connections.
    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// The live classroom session. Lock it before the deadline slot, never after.
    pub fn session(&self) -> &Mutex<PollSession> {
        &self.session
    }

    /// Timer armed for the active poll.
    pub(crate) fn deadline_slot(&self) -> &Mutex<Option<PendingDeadline>> {
        &self.deadline
    }

    /// Background writer for poll history.
    pub fn persistence(&self) -> &PersistenceQueue {
        &self.persistence
    }
}
