//! Phase timers. A timer is a detached task that sleeps, then re-enters the session lock and
//! lets the session decide whether the phase it was armed for is still running.

use std::time::SystemTime;

use tokio::time::sleep;
use tracing::debug;

use crate::{
    services::sse_events,
    state::{
        SharedState,
        game::SessionId,
        scheduler::{PhaseTimer, TimerFired, TimerTag},
    },
};

/// Spawn the countdown for `timer`. There is no cancellation: stale timers are ignored on firing.
pub fn arm(state: &SharedState, session_id: SessionId, timer: PhaseTimer) {
    debug!(
        %session_id,
        phase = ?timer.tag.phase,
        seconds = timer.duration.as_secs(),
        "phase timer armed"
    );

    let state = state.clone();
    tokio::spawn(async move {
        sleep(timer.duration).await;
        fire(&state, session_id, timer.tag).await;
    });
}

async fn fire(state: &SharedState, session_id: SessionId, tag: TimerTag) {
    let Some(handle) = state.sessions().get(session_id) else {
        debug!(%session_id, "timer fired for a deleted session");
        return;
    };
    let mut session = handle.lock().await;

    let outcome = session.fire_timer(tag, &mut rand::rng(), SystemTime::now());
    match outcome {
        TimerFired::Stale => {
            debug!(%session_id, phase = ?tag.phase, "stale phase timer ignored");
        }
        TimerFired::Advanced(next) => {
            if let Some(next) = next {
                arm(state, session_id, next);
            }
            sse_events::broadcast_game_update(state, &session);
        }
    }
}
