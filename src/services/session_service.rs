//! Player commands against a session. Each command locks the session, applies the change
//! (including any phase transitions it cascades into), arms the timer the change produced and
//! pushes a single snapshot to the session's subscribers.

use std::time::SystemTime;

use rand::rngs::ThreadRng;
use tracing::{debug, info};

use crate::{
    dto::session::SessionSnapshot,
    error::{Rejection, ServiceError},
    services::{sse_events, timer_service},
    state::{
        SharedState,
        game::{
            GameConfigPatch, GameSession, PlayerId, ProposalId, QuestionDraft, QuestionId,
            SessionId, TeamId,
        },
        scheduler::PhaseTimer,
    },
};

fn sanitize_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Rejection::BlankName.into());
    }
    Ok(name.to_string())
}

/// Run `command` on the locked session, then arm its timer and notify subscribers.
///
/// Nothing is armed or broadcast when the command is rejected.
async fn mutate<T, F>(
    state: &SharedState,
    session_id: SessionId,
    command: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(
        &mut GameSession,
        &mut ThreadRng,
        SystemTime,
    ) -> Result<(T, Option<PhaseTimer>), ServiceError>,
{
    let handle = state.sessions().require(session_id)?;
    let mut session = handle.lock().await;

    let (value, timer) = command(&mut *session, &mut rand::rng(), SystemTime::now())
        .inspect_err(|err| debug!(%session_id, reason = %err, "command rejected"))?;

    if let Some(timer) = timer {
        timer_service::arm(state, session_id, timer);
    }
    sse_events::broadcast_game_update(state, &session);
    Ok(value)
}

/// Open a new lobby whose admin is the creator.
pub fn create_session(
    state: &SharedState,
    admin_name: &str,
) -> Result<(SessionId, PlayerId), ServiceError> {
    let name = sanitize_name(admin_name)?;
    let (session_id, player_id) = state.sessions().create(name, state.config());
    info!(%session_id, "session created");
    Ok((session_id, player_id))
}

/// Register a player in a lobby. Every join opens a new team colored from the palette.
pub async fn join_session(
    state: &SharedState,
    session_id: SessionId,
    player_name: &str,
) -> Result<PlayerId, ServiceError> {
    let name = sanitize_name(player_name)?;
    mutate(state, session_id, |session, _, _| {
        let color = state.config().team_color(session.teams.len());
        let player_id = session.join(name, color)?;
        info!(%session_id, %player_id, "player joined");
        Ok((player_id, None))
    })
    .await
}

/// Move the player to another team while in the lobby.
pub async fn switch_team(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    team_id: TeamId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, _| {
        session.switch_team(player_id, team_id)?;
        Ok(((), None))
    })
    .await
}

/// Merge the admin's partial rules into the session configuration.
pub async fn update_config(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    patch: GameConfigPatch,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, _| {
        session.update_config(player_id, patch)?;
        Ok(((), None))
    })
    .await
}

/// Leave the lobby and start question authoring.
pub async fn start_game(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, now| {
        let timer = session.start_game(player_id, now)?;
        Ok(((), Some(timer)))
    })
    .await
}

/// Propose a question for the player's team.
pub async fn submit_question(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    draft: QuestionDraft,
) -> Result<ProposalId, ServiceError> {
    mutate(state, session_id, |session, _, _| {
        Ok((session.submit_question(player_id, draft)?, None))
    })
    .await
}

/// Toggle the player's upvote on a question proposal of their team.
pub async fn upvote_question(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    proposal_id: ProposalId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, _| {
        session.upvote_question(player_id, proposal_id)?;
        Ok(((), None))
    })
    .await
}

/// Propose an answer to a question in play for the player's team.
pub async fn submit_answer(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    question_id: QuestionId,
    choice_index: usize,
) -> Result<ProposalId, ServiceError> {
    mutate(state, session_id, |session, _, _| {
        Ok((
            session.submit_answer(player_id, question_id, choice_index)?,
            None,
        ))
    })
    .await
}

/// Toggle the player's upvote on an answer proposal of their team.
pub async fn upvote_answer(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
    question_id: QuestionId,
    proposal_id: ProposalId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, _| {
        session.upvote_answer(player_id, question_id, proposal_id)?;
        Ok(((), None))
    })
    .await
}

/// Toggle the player's skip vote, closing the current phase on majority.
pub async fn vote_skip(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, rng, now| {
        let timer = session.vote_skip(player_id, rng, now)?;
        Ok(((), timer))
    })
    .await
}

/// Send a finished game back to the lobby.
pub async fn replay(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
) -> Result<(), ServiceError> {
    mutate(state, session_id, |session, _, _| {
        session.replay(player_id)?;
        Ok(((), None))
    })
    .await
}

/// Destroy a session and close its event streams. Admin only.
pub async fn delete_session(
    state: &SharedState,
    session_id: SessionId,
    player_id: PlayerId,
) -> Result<(), ServiceError> {
    let handle = state.sessions().require(session_id)?;
    {
        let session = handle.lock().await;
        session.ensure_admin(player_id)?;
        state.sessions().delete(session_id);
    }
    state.hubs().remove(session_id);

    info!(%session_id, "session deleted");
    Ok(())
}

/// Current state of the session.
pub async fn snapshot(
    state: &SharedState,
    session_id: SessionId,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.sessions().require(session_id)?;
    let session = handle.lock().await;
    Ok(SessionSnapshot::from(&*session))
}
