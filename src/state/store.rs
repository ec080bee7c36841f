use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    error::{Missing, ServiceError},
    state::game::{GameSession, PlayerId, SessionId},
};

/// Lock guarding a single session. Commands on one session are serialised through it.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Registry of live sessions keyed by id.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lobby session whose admin is `admin_name`, returning both ids.
    pub fn create(&self, admin_name: String, config: &AppConfig) -> (SessionId, PlayerId) {
        let session = GameSession::new(admin_name, config.game_defaults(), config.team_color(0));
        let ids = (session.id, session.admin_id);
        self.sessions.insert(ids.0, Arc::new(Mutex::new(session)));
        ids
    }

    /// Handle to the session, if it exists.
    pub fn get(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
    }

    /// Handle to the session, or `session_not_found`.
    pub fn require(&self, session_id: SessionId) -> Result<SessionHandle, ServiceError> {
        self.get(session_id).ok_or(Missing::Session.into())
    }

    /// Forget a session. Returns whether it existed.
    pub fn delete(&self, session_id: SessionId) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
