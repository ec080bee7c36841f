/// Session aggregate and entities.
pub mod game;
/// Upvoted proposal ledgers.
pub mod proposal;
/// Phase scheduling, timers and skip votes.
pub mod scheduler;
/// End-of-game scoring.
pub mod scoring;
mod sse;
/// Session status transitions.
pub mod state_machine;
/// Registry of live sessions.
pub mod store;

use std::sync::Arc;

use crate::config::AppConfig;

pub use self::sse::{SessionHubs, SseHub};
use self::store::SessionStore;

/// Application state shared across handlers and timer tasks.
pub type SharedState = Arc<AppState>;

/// Capacity of each per-session broadcast channel.
const SSE_CHANNEL_CAPACITY: usize = 16;

/// Central application state: live sessions, their event hubs and the loaded configuration.
pub struct AppState {
    sessions: SessionStore,
    hubs: SessionHubs,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            sessions: SessionStore::new(),
            hubs: SessionHubs::new(SSE_CHANNEL_CAPACITY),
            config,
        })
    }

    /// Registry of live sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Per-session SSE hubs.
    pub fn hubs(&self) -> &SessionHubs {
        &self.hubs
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
