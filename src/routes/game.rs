use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use axum_valid::Valid;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::{
        action::{
            ActionKind, ActionRequest, ActionResponse, CreateGameRequest, CreateGameResponse,
            JoinGameRequest, JoinGameResponse, SubmitAnswerData, SubmitQuestionData,
            SwitchTeamData, UpdateConfigData, UpvoteAnswerData, UpvoteQuestionData,
        },
        session::SessionSnapshot,
    },
    error::{AppError, Rejection, ServiceError},
    services::session_service,
    state::{SharedState, game::PlayerId},
};

const PLAYER_ID_HEADER: &str = "x-player-id";

/// Session routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/game", post(create_game))
        .route("/api/game/{id}", get(get_game).delete(delete_game))
        .route("/api/join", post(join_game))
        .route("/api/action", post(run_action))
}

/// Identity of the calling player, carried in the `x-player-id` header.
fn player_id(headers: &HeaderMap) -> Result<PlayerId, AppError> {
    headers
        .get(PLAYER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))
}

/// Decode the action-specific part of an `/api/action` request.
fn action_data<T: DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data)
        .map_err(|err| AppError::BadRequest(format!("invalid action data: {err}")))
}

/// Open a new session; the caller becomes its admin.
#[utoipa::path(
    post,
    path = "/api/game",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Session created", body = CreateGameResponse),
        (status = 400, description = "Blank player name")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let (game_id, player_id) = session_service::create_session(&state, &payload.player_name)?;
    Ok(Json(CreateGameResponse { game_id, player_id }))
}

/// Join a session that is still in its lobby.
#[utoipa::path(
    post,
    path = "/api/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Player registered", body = JoinGameResponse),
        (status = 400, description = "Blank player name"),
        (status = 404, description = "Game not found or already started")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let player_id =
        session_service::join_session(&state, payload.game_id, &payload.player_name)
            .await
            .map_err(|err| match err {
                ServiceError::Rejected(Rejection::WrongPhase) => {
                    AppError::NotFound("game_already_started".into())
                }
                other => other.into(),
            })?;
    Ok(Json(JoinGameResponse { player_id }))
}

/// Run a player command against a session.
#[utoipa::path(
    post,
    path = "/api/action",
    tag = "game",
    request_body = ActionRequest,
    params(("x-player-id" = String, Header, description = "Player id returned on create or join")),
    responses(
        (status = 200, description = "Command applied", body = ActionResponse),
        (status = 400, description = "Command rejected in the current state"),
        (status = 401, description = "Missing player identity"),
        (status = 404, description = "Unknown game, team or proposal")
    )
)]
pub async fn run_action(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let player = player_id(&headers)?;
    let ActionRequest {
        game_id,
        action,
        data,
    } = request;

    let proposal_id = match action {
        ActionKind::SwitchTeam => {
            let SwitchTeamData { team_id } = action_data(data)?;
            session_service::switch_team(&state, game_id, player, team_id).await?;
            None
        }
        ActionKind::UpdateConfig => {
            let UpdateConfigData { config } = action_data(data)?;
            session_service::update_config(&state, game_id, player, config).await?;
            None
        }
        ActionKind::StartGame => {
            session_service::start_game(&state, game_id, player).await?;
            None
        }
        ActionKind::SubmitQuestion => {
            let question: SubmitQuestionData = action_data(data)?;
            let id =
                session_service::submit_question(&state, game_id, player, question.into()).await?;
            Some(id)
        }
        ActionKind::UpvoteQuestion => {
            let UpvoteQuestionData { proposal_id } = action_data(data)?;
            session_service::upvote_question(&state, game_id, player, proposal_id).await?;
            None
        }
        ActionKind::SubmitAnswer => {
            let SubmitAnswerData {
                question_id,
                choice_index,
            } = action_data(data)?;
            let id = session_service::submit_answer(
                &state,
                game_id,
                player,
                question_id,
                choice_index,
            )
            .await?;
            Some(id)
        }
        ActionKind::UpvoteAnswer => {
            let UpvoteAnswerData {
                question_id,
                proposal_id,
            } = action_data(data)?;
            session_service::upvote_answer(&state, game_id, player, question_id, proposal_id)
                .await?;
            None
        }
        ActionKind::VoteSkip => {
            session_service::vote_skip(&state, game_id, player).await?;
            None
        }
        ActionKind::Replay => {
            session_service::replay(&state, game_id, player).await?;
            None
        }
    };

    Ok(Json(ActionResponse::with(proposal_id)))
}

/// Return the current state of a session.
#[utoipa::path(
    get,
    path = "/api/game/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::snapshot(&state, id).await?))
}

/// Delete a session and close its streams. Admin only.
#[utoipa::path(
    delete,
    path = "/api/game/{id}",
    tag = "game",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("x-player-id" = String, Header, description = "Admin player id")
    ),
    responses(
        (status = 200, description = "Session deleted", body = ActionResponse),
        (status = 400, description = "Caller is not the admin"),
        (status = 401, description = "Missing player identity"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, AppError> {
    let player = player_id(&headers)?;
    session_service::delete_session(&state, id, player).await?;
    Ok(Json(ActionResponse::done()))
}
