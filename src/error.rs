use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::state_machine::InvalidTransition;

/// Reasons a well-formed command is refused in the current session state.
///
/// The `Display` output is the machine-readable code returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Only the session admin may run this command.
    #[error("not_admin")]
    NotAdmin,
    /// The command is not legal in the current status.
    #[error("wrong_phase")]
    WrongPhase,
    /// Starting requires at least two players.
    #[error("not_enough_players")]
    NotEnoughPlayers,
    /// Starting requires every player to have joined a team.
    #[error("players_without_team")]
    PlayersWithoutTeam,
    /// The acting player has not joined a team yet.
    #[error("player_not_in_team")]
    PlayerNotInTeam,
    /// Question text is empty or the choice count is out of range.
    #[error("invalid_question")]
    InvalidQuestion,
    /// The correct index does not point into the choice list.
    #[error("invalid_correct_index")]
    InvalidCorrectIndex,
    /// A configuration value is out of its accepted range.
    #[error("invalid_config")]
    InvalidConfig,
    /// Player names must contain at least one visible character.
    #[error("blank_name")]
    BlankName,
}

/// Kind of entity a command referenced but which does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Missing {
    /// Unknown session id.
    #[error("session_not_found")]
    Session,
    /// Unknown player id within the session.
    #[error("player_not_found")]
    Player,
    /// Unknown team id within the session.
    #[error("team_not_found")]
    Team,
    /// Unknown proposal id within the acting team's list.
    #[error("proposal_not_found")]
    Proposal,
}

/// Errors produced by the game core. Both kinds are recoverable and reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Command is illegal in the current state.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(#[from] Missing),
}

impl ServiceError {
    /// Short machine-readable reason, without the error-kind prefix.
    pub fn reason(&self) -> String {
        match self {
            ServiceError::Rejected(rejection) => rejection.to_string(),
            ServiceError::NotFound(missing) => missing.to_string(),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(_: InvalidTransition) -> Self {
        ServiceError::Rejected(Rejection::WrongPhase)
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input or an illegal command.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or malformed player identity.
    #[error("{0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(_) => AppError::BadRequest(err.reason()),
            ServiceError::NotFound(_) => AppError::NotFound(err.reason()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let payload = Json(ErrorBody {
            success: false,
            error: self.to_string(),
        });

        (status, payload).into_response()
    }
}
