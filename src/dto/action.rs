//! Request and response bodies of the game HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_player_name,
    state::game::{GameConfigPatch, QuestionDraft},
};

/// Payload used to open a new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Name of the creator, who becomes the session admin.
    #[validate(custom(function = "validate_player_name"))]
    pub player_name: String,
}

/// Identifiers handed back to the session creator.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    /// Identifier of the new session.
    pub game_id: Uuid,
    /// Identifier of the creator, who is the session admin.
    pub player_id: Uuid,
}

/// Payload used to join an existing lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    /// Session to join.
    pub game_id: Uuid,
    /// Display name of the joining player.
    #[validate(custom(function = "validate_player_name"))]
    pub player_name: String,
}

/// Identifier handed back to a joining player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    /// Identifier to send in the `x-player-id` header.
    pub player_id: Uuid,
}

/// Player command dispatched through `/api/action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Move to another team while in the lobby.
    SwitchTeam,
    /// Change the session rules (admin only, lobby only).
    UpdateConfig,
    /// Leave the lobby and open question authoring (admin only).
    StartGame,
    /// Propose a question for the player's team.
    SubmitQuestion,
    /// Toggle an upvote on a question proposal of the player's team.
    UpvoteQuestion,
    /// Propose an answer for a question in play.
    SubmitAnswer,
    /// Toggle an upvote on an answer proposal of the player's team.
    UpvoteAnswer,
    /// Toggle the player's vote to end the current phase early.
    VoteSkip,
    /// Send a finished game back to the lobby (admin only).
    Replay,
}

/// Envelope of every player command. The shape of `data` depends on `action`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Target session.
    pub game_id: Uuid,
    /// Command to run.
    pub action: ActionKind,
    /// Action-specific arguments; ignored by commands that take none.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

/// `data` of `switch_team`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwitchTeamData {
    /// Team to move to.
    pub team_id: Uuid,
}

/// `data` of `update_config`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateConfigData {
    /// Fields to overwrite; omitted fields keep their value.
    pub config: GameConfigPatch,
}

/// `data` of `submit_question`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionData {
    /// Question text, trimmed before storage.
    pub text: String,
    /// Answer choices shown to the other teams.
    pub choices: Vec<String>,
    /// Index of the correct entry in `choices`.
    pub correct_index: usize,
}

impl From<SubmitQuestionData> for QuestionDraft {
    fn from(data: SubmitQuestionData) -> Self {
        Self {
            text: data.text,
            choices: data.choices,
            correct_index: data.correct_index,
        }
    }
}

/// `data` of `upvote_question`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteQuestionData {
    /// Question proposal to upvote.
    pub proposal_id: Uuid,
}

/// `data` of `submit_answer`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerData {
    /// Question being answered.
    pub question_id: Uuid,
    /// Index of the proposed choice.
    pub choice_index: usize,
}

/// `data` of `upvote_answer`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteAnswerData {
    /// Question the proposal answers.
    pub question_id: Uuid,
    /// Answer proposal to upvote.
    pub proposal_id: Uuid,
}

/// Successful command acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Always `true`; failures use the error body instead.
    pub success: bool,
    /// Command-specific outcome.
    pub result: ActionOutcome,
}

/// Outcome of a successful command.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Always `true`.
    pub success: bool,
    /// Id of the proposal created by `submit_question` or `submit_answer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<Uuid>,
}

impl ActionResponse {
    /// Acknowledge a command that produced nothing.
    pub fn done() -> Self {
        Self::with(None)
    }

    /// Acknowledge a command, optionally returning a freshly created proposal id.
    pub fn with(proposal_id: Option<Uuid>) -> Self {
        Self {
            success: true,
            result: ActionOutcome {
                success: true,
                proposal_id,
            },
        }
    }
}
