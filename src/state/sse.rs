use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{dto::sse::ServerEvent, state::game::SessionId};

/// Per-session broadcast hubs, created lazily on first subscription or notification.
pub struct SessionHubs {
    hubs: DashMap<SessionId, SseHub>,
    capacity: usize,
}

impl SessionHubs {
    /// Build an empty registry whose hubs use the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Register a subscriber for `session_id`, creating its hub if needed.
    pub fn subscribe(&self, session_id: SessionId) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(session_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Fan `event` out to the subscribers of `session_id`. Sessions without a hub are skipped.
    pub fn broadcast(&self, session_id: SessionId, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(&session_id) {
            hub.broadcast(event);
        }
    }

    /// Drop the hub of a deleted session, closing every open stream.
    pub fn remove(&self, session_id: SessionId) {
        self.hubs.remove(&session_id);
    }

    /// Drop the hub of `session_id` once its last subscriber has gone.
    pub fn prune(&self, session_id: SessionId) {
        self.hubs
            .remove_if(&session_id, |_, hub| hub.receiver_count() == 0);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        // Fails only when nobody is subscribed, which is a normal state for a session.
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
