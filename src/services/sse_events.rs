use tracing::warn;

use crate::{
    dto::sse::{ServerEvent, SessionEvent},
    state::{SharedState, game::GameSession},
};

/// Build the `game_update` message carrying the full session state.
pub fn game_update_event(session: &GameSession) -> Option<ServerEvent> {
    let payload = SessionEvent::GameUpdate {
        game: session.into(),
    };
    match ServerEvent::json(None::<String>, &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(session_id = %session.id, error = %err, "failed to serialize session SSE payload");
            None
        }
    }
}

/// Broadcast a snapshot of the session to its subscribers.
pub fn broadcast_game_update(state: &SharedState, session: &GameSession) {
    if let Some(event) = game_update_event(session) {
        state.hubs().broadcast(session.id, event);
    }
}
