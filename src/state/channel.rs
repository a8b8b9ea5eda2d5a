use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Identifier assigned to each WebSocket connection.
pub type PeerId = Uuid;

/// Frame queued for a connection's writer task.
#[derive(Debug, Clone)]
pub enum PeerFrame {
    /// Named event to serialize onto the socket.
    Event(ServerEvent),
    /// Close the socket once queued frames are flushed.
    Close,
}

#[derive(Clone)]
/// Handle used to push frames to a connected peer.
pub struct PeerConnection {
    pub id: PeerId,
    pub tx: mpsc::UnboundedSender<PeerFrame>,
}

/// Registry of live connections keyed by peer id.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, PeerConnection>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection.
    pub fn register(&self, connection: PeerConnection) {
        self.peers.insert(connection.id, connection);
    }

    /// Forget a connection.
    pub fn unregister(&self, peer_id: PeerId) -> Option<PeerConnection> {
        self.peers.remove(&peer_id).map(|(_, connection)| connection)
    }

    /// Whether the peer is still routed. False once it has been disconnected or unregistered.
    pub fn contains(&self, peer_id: PeerId) -> bool {
        self.peers.contains_key(&peer_id)
    }

    /// Queue an event for a single peer. Returns `false` when the peer is gone.
    pub fn send_to(&self, peer_id: PeerId, event: ServerEvent) -> bool {
        let Some(tx) = self.peers.get(&peer_id).map(|entry| entry.tx.clone()) else {
            return false;
        };
        if tx.send(PeerFrame::Event(event)).is_err() {
            debug!(peer_id = %peer_id, "writer closed, dropping peer");
            self.peers.remove(&peer_id);
            return false;
        }
        true
    }

    /// Queue an event for every peer, pruning connections whose writer already exited.
    pub fn broadcast(&self, event: &ServerEvent) {
        let mut dead = Vec::new();
        for entry in self.peers.iter() {
            if entry.tx.send(PeerFrame::Event(event.clone())).is_err() {
                dead.push(*entry.key());
            }
        }
        for peer_id in dead {
            debug!(peer_id = %peer_id, "writer closed, dropping peer");
            self.peers.remove(&peer_id);
        }
    }

    /// Ask a peer's writer to close the socket and stop routing events to it.
    pub fn disconnect(&self, peer_id: PeerId) -> bool {
        match self.peers.remove(&peer_id) {
            Some((_, connection)) => connection.tx.send(PeerFrame::Close).is_ok(),
            None => false,
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Fan-out feeding the read-only SSE observers (projector screens and dashboards).
pub struct ObserverHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl ObserverHub {
    /// Create a hub buffering up to `capacity` events per lagging observer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new observer that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no observer is not an error.
    pub fn publish(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(registry: &PeerRegistry) -> (PeerId, mpsc::UnboundedReceiver<PeerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        registry.register(PeerConnection { id, tx });
        (id, rx)
    }

    fn event(name: &str) -> ServerEvent {
        ServerEvent::json(name, &serde_json::json!({ "name": name })).unwrap()
    }

    #[test]
    fn broadcast_reaches_every_peer_and_prunes_dead_ones() {
        let registry = PeerRegistry::new();
        let (_, mut alive) = connect(&registry);
        let (_, dead) = connect(&registry);
        drop(dead);

        registry.broadcast(&event("roster"));

        assert!(matches!(
            alive.try_recv(),
            Ok(PeerFrame::Event(ServerEvent { ref event, .. })) if event == "roster"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn send_to_targets_one_peer() {
        let registry = PeerRegistry::new();
        let (first, mut first_rx) = connect(&registry);
        let (_, mut second_rx) = connect(&registry);

        assert!(registry.send_to(first, event("joined")));
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_err());
        assert!(!registry.send_to(Uuid::new_v4(), event("joined")));
    }

    #[test]
    fn observers_receive_published_events() {
        let hub = ObserverHub::new(4);
        hub.publish(event("ignored"));

        let mut observer = hub.subscribe();
        assert_eq!(hub.observer_count(), 1);
        hub.publish(event("poll_state"));
        assert_eq!(observer.try_recv().unwrap().event, "poll_state");
    }

    #[test]
    fn disconnect_queues_close_and_unregisters() {
        let registry = PeerRegistry::new();
        let (peer, mut rx) = connect(&registry);

        assert!(registry.contains(peer));
        assert!(registry.disconnect(peer));
        assert!(matches!(rx.try_recv(), Ok(PeerFrame::Close)));
        assert!(!registry.contains(peer));
        assert!(registry.is_empty());
        assert!(!registry.disconnect(peer));
    }
}
