use std::{
    collections::HashSet,
    time::{Duration, SystemTime},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{Missing, Rejection, ServiceError},
    state::{proposal::ProposalList, state_machine::GameStatus},
};

/// Identifier of a game session.
pub type SessionId = Uuid;
/// Identifier of a player inside a session.
pub type PlayerId = Uuid;
/// Identifier of a team inside a session.
pub type TeamId = Uuid;
/// Identifier of a question or answer proposal.
pub type ProposalId = Uuid;
/// Identifier of a finalized question (the winning proposal id, or a fresh one for placeholders).
pub type QuestionId = Uuid;

/// Points awarded by the scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Points credited to an answering team for each correct guess.
    pub correct_answer: i32,
    /// Maximum reward for an author whose question lands in the sweet spot.
    pub question_answered: i32,
    /// Credit (usually negative) for a question that was too easy or too hard.
    pub question_unanswered: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            correct_answer: 10,
            question_answered: 5,
            question_unanswered: -3,
        }
    }
}

/// Session-scoped rules, editable by the admin while in the lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// Finalized questions each team contributes.
    #[validate(range(min = 1, max = 50))]
    pub questions_per_team: usize,
    /// Questions each team contributes to a single turn.
    #[validate(range(min = 1, max = 50))]
    pub questions_per_turn: usize,
    /// Seconds allotted to question authoring.
    #[validate(range(min = 1, max = 3600))]
    pub question_submit_timer: u64,
    /// Seconds allotted to each answering turn.
    #[validate(range(min = 1, max = 3600))]
    pub answer_timer: u64,
    /// Fraction of a team's members needed for the team to vote skip.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub skip_member_majority: f64,
    /// Fraction of teams that must vote skip to end the phase.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub skip_team_majority: f64,
    /// Upper bound on the number of choices of a proposed question.
    #[validate(range(min = 2, max = 10))]
    pub max_choices: usize,
    /// Reward curve parameters.
    pub scoring: ScoringConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_team: 6,
            questions_per_turn: 2,
            question_submit_timer: 300,
            answer_timer: 60,
            skip_member_majority: 0.67,
            skip_team_majority: 0.75,
            max_choices: 4,
            scoring: ScoringConfig::default(),
        }
    }
}

/// Partial configuration sent by the admin. Present fields overwrite the current ones.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameConfigPatch {
    /// Finalized questions each team contributes.
    #[validate(range(min = 1, max = 50))]
    pub questions_per_team: Option<usize>,
    /// Questions each team contributes to a single turn.
    #[validate(range(min = 1, max = 50))]
    pub questions_per_turn: Option<usize>,
    /// Seconds allotted to question authoring.
    #[validate(range(min = 1, max = 3600))]
    pub question_submit_timer: Option<u64>,
    /// Seconds allotted to each answering turn.
    #[validate(range(min = 1, max = 3600))]
    pub answer_timer: Option<u64>,
    /// Fraction of a team's members needed for the team to vote skip.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub skip_member_majority: Option<f64>,
    /// Fraction of teams that must vote skip to end the phase.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub skip_team_majority: Option<f64>,
    /// Upper bound on the number of choices of a proposed question.
    #[validate(range(min = 2, max = 10))]
    pub max_choices: Option<usize>,
    /// Replaces the whole scoring record when present; fields are not merged individually.
    pub scoring: Option<ScoringConfig>,
}

impl GameConfig {
    /// Shallow merge of `patch` over the current values.
    pub fn apply(&mut self, patch: GameConfigPatch) {
        let GameConfigPatch {
            questions_per_team,
            questions_per_turn,
            question_submit_timer,
            answer_timer,
            skip_member_majority,
            skip_team_majority,
            max_choices,
            scoring,
        } = patch;

        if let Some(value) = questions_per_team {
            self.questions_per_team = value;
        }
        if let Some(value) = questions_per_turn {
            self.questions_per_turn = value;
        }
        if let Some(value) = question_submit_timer {
            self.question_submit_timer = value;
        }
        if let Some(value) = answer_timer {
            self.answer_timer = value;
        }
        if let Some(value) = skip_member_majority {
            self.skip_member_majority = value;
        }
        if let Some(value) = skip_team_majority {
            self.skip_team_majority = value;
        }
        if let Some(value) = max_choices {
            self.max_choices = value;
        }
        if let Some(value) = scoring {
            self.scoring = value;
        }
    }

    /// Number of answering turns needed to play every finalized question.
    pub fn total_turns(&self) -> u32 {
        self.questions_per_team.div_ceil(self.questions_per_turn.max(1)) as u32
    }
}

/// Participant of a session.
#[derive(Debug, Clone)]
pub struct Player {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name, trimmed.
    pub name: String,
    /// `None` until the player explicitly picks a team.
    pub team_id: Option<TeamId>,
}

/// Group of players that authors and answers together.
#[derive(Debug, Clone)]
pub struct Team {
    /// Team identifier.
    pub id: TeamId,
    /// Display name, numbered in creation order.
    pub name: String,
    /// CSS color picked from the palette when the team was created.
    pub color: String,
    /// Members in the order they joined the team.
    pub player_ids: Vec<PlayerId>,
    /// Final score, written by the scoring pass and reset on replay.
    pub score: i32,
}

/// Question content carried by a question proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    /// Question text.
    pub text: String,
    /// Answer choices.
    pub choices: Vec<String>,
    /// Index of the correct choice.
    pub correct_index: usize,
}

/// A question frozen for play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Winning proposal id, or a fresh id for placeholders.
    pub id: QuestionId,
    /// Question text.
    pub text: String,
    /// Answer choices.
    pub choices: Vec<String>,
    /// Index of the correct choice.
    pub correct_index: usize,
}

/// Reference to a question played during a turn, tagged with its author team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionInPlay {
    /// Question being played.
    pub question_id: QuestionId,
    /// Team that authored it.
    pub from_team: TeamId,
}

/// Wall-clock bounds of a timed phase, exposed to clients for countdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseClock {
    /// Wall-clock start.
    pub started_at: SystemTime,
    /// Configured length.
    pub duration: Duration,
    /// Wall-clock deadline.
    pub ends_at: SystemTime,
}

impl PhaseClock {
    /// Clock starting at `now` and running for `seconds`.
    pub fn starting(now: SystemTime, seconds: u64) -> Self {
        let duration = Duration::from_secs(seconds);
        Self {
            started_at: now,
            duration,
            ends_at: now + duration,
        }
    }
}

/// One round of answering.
#[derive(Debug, Clone)]
pub struct Turn {
    /// 1-based turn number.
    pub number: u32,
    /// Shuffled presentation order of the questions in play.
    pub questions_in_play: Vec<QuestionInPlay>,
    /// Countdown bounds of the turn.
    pub clock: PhaseClock,
}

/// Skip-vote tally for one team.
#[derive(Debug, Clone, Default)]
pub struct SkipVote {
    /// Whether the team reached its internal majority.
    pub voted: bool,
    /// Members currently voting to skip.
    pub skip_voters: HashSet<PlayerId>,
}

/// Outcome of one answering team on one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamAnswer {
    /// `None` when the team never proposed an answer.
    pub choice_index: Option<usize>,
    /// Whether the choice matched the correct index.
    pub correct: bool,
}

/// Scoring breakdown for one finalized question.
#[derive(Debug, Clone)]
pub struct QuestionResult {
    /// The question as it was played.
    pub question: Question,
    /// Team that authored it.
    pub from_team: TeamId,
    /// Choice of every answering team.
    pub team_answers: IndexMap<TeamId, TeamAnswer>,
    /// Answering teams that were correct.
    pub correct_count: usize,
    /// Number of answering teams.
    pub total_answering: usize,
    /// `correct_count / total_answering`, or 0 with no answering team.
    pub correct_percentage: f64,
    /// Points credited to the authoring team for this question.
    pub question_points: i32,
}

/// Everything needed for the post-game display.
#[derive(Debug, Clone, Default)]
pub struct GameResults {
    /// Breakdown per finalized question, authors in team order.
    pub questions: Vec<QuestionResult>,
    /// Total score per team.
    pub final_scores: IndexMap<TeamId, i32>,
}

/// Aggregate root for a single running game.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Session identifier.
    pub id: SessionId,
    /// Player allowed to configure, start, replay and delete the session.
    pub admin_id: PlayerId,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Creation time.
    pub created_at: SystemTime,
    /// Incremented on every start so timers from an earlier game are recognisably stale.
    pub game_number: u32,
    /// Rules of the current or next game.
    pub config: GameConfig,
    /// Players in join order.
    pub players: IndexMap<PlayerId, Player>,
    /// Insertion order is the team numbering order.
    pub teams: IndexMap<TeamId, Team>,
    /// Question proposals of each team.
    pub question_proposals: IndexMap<TeamId, ProposalList<QuestionDraft>>,
    /// Timer bounds of the question authoring phase.
    pub submission_clock: Option<PhaseClock>,
    /// Finalized questions of each team, shuffled.
    pub questions: IndexMap<TeamId, Vec<Question>>,
    /// Active answering turn.
    pub current_turn: Option<Turn>,
    /// Answer proposals of each team for the current turn, keyed by question.
    pub answer_proposals: IndexMap<TeamId, IndexMap<QuestionId, ProposalList<usize>>>,
    /// Answering team, then question, then the chosen index (`None` for "no answer").
    pub answers: IndexMap<TeamId, IndexMap<QuestionId, Option<usize>>>,
    /// Skip-vote tallies while a timed phase runs.
    pub skip_votes: Option<IndexMap<TeamId, SkipVote>>,
    /// Scores and breakdown once the game is finished.
    pub results: Option<GameResults>,
}

impl GameSession {
    /// Build a lobby session whose first player is the admin.
    pub fn new(admin_name: String, config: GameConfig, admin_team_color: String) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            admin_id: Uuid::nil(),
            status: GameStatus::Lobby,
            created_at: SystemTime::now(),
            game_number: 0,
            config,
            players: IndexMap::new(),
            teams: IndexMap::new(),
            question_proposals: IndexMap::new(),
            submission_clock: None,
            questions: IndexMap::new(),
            current_turn: None,
            answer_proposals: IndexMap::new(),
            answers: IndexMap::new(),
            skip_votes: None,
            results: None,
        };
        session.admin_id = session.add_player(admin_name, admin_team_color);
        session
    }

    /// Register a new player while in the lobby.
    ///
    /// Every join creates a fresh team; the player still has to pick one explicitly.
    pub fn join(&mut self, name: String, team_color: String) -> Result<PlayerId, ServiceError> {
        if self.status != GameStatus::Lobby {
            return Err(Rejection::WrongPhase.into());
        }
        Ok(self.add_player(name, team_color))
    }

    fn add_player(&mut self, name: String, team_color: String) -> PlayerId {
        let team_id = Uuid::new_v4();
        let team = Team {
            id: team_id,
            name: format!("Team {}", self.teams.len() + 1),
            color: team_color,
            player_ids: Vec::new(),
            score: 0,
        };
        self.teams.insert(team_id, team);

        let player_id = Uuid::new_v4();
        self.players.insert(
            player_id,
            Player {
                id: player_id,
                name,
                team_id: None,
            },
        );
        player_id
    }

    /// Move a player to `team_id`, leaving their previous team if any.
    pub fn switch_team(&mut self, player_id: PlayerId, team_id: TeamId) -> Result<(), ServiceError> {
        if self.status != GameStatus::Lobby {
            return Err(Rejection::WrongPhase.into());
        }
        if !self.teams.contains_key(&team_id) {
            return Err(Missing::Team.into());
        }
        let player = self.players.get_mut(&player_id).ok_or(Missing::Player)?;

        if let Some(previous) = player.team_id.replace(team_id) {
            if let Some(old_team) = self.teams.get_mut(&previous) {
                old_team.player_ids.retain(|id| *id != player_id);
            }
        }
        if let Some(team) = self.teams.get_mut(&team_id) {
            team.player_ids.push(player_id);
        }
        Ok(())
    }

    /// Admin-only shallow merge of the rules while in the lobby.
    pub fn update_config(
        &mut self,
        player_id: PlayerId,
        patch: GameConfigPatch,
    ) -> Result<(), ServiceError> {
        self.ensure_admin(player_id)?;
        if self.status != GameStatus::Lobby {
            return Err(Rejection::WrongPhase.into());
        }
        if patch.validate().is_err() {
            return Err(Rejection::InvalidConfig.into());
        }
        self.config.apply(patch);
        Ok(())
    }

    /// Fail unless `player_id` is the session admin.
    pub fn ensure_admin(&self, player_id: PlayerId) -> Result<(), ServiceError> {
        if !self.players.contains_key(&player_id) {
            return Err(Missing::Player.into());
        }
        if self.admin_id != player_id {
            return Err(Rejection::NotAdmin.into());
        }
        Ok(())
    }

    /// Team of an existing player, rejecting players who have not picked one.
    pub fn team_of(&self, player_id: PlayerId) -> Result<TeamId, ServiceError> {
        let player = self.players.get(&player_id).ok_or(Missing::Player)?;
        player
            .team_id
            .ok_or(ServiceError::Rejected(Rejection::PlayerNotInTeam))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> GameSession {
        GameSession::new("Ada".into(), GameConfig::default(), "#FF6B6B".into())
    }

    #[test]
    fn admin_is_registered_like_any_joiner() {
        let session = lobby();

        assert_eq!(session.status, GameStatus::Lobby);
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.teams.len(), 1);

        let admin = &session.players[&session.admin_id];
        assert_eq!(admin.name, "Ada");
        assert!(admin.team_id.is_none());

        let team = session.teams.values().next().unwrap();
        assert_eq!(team.name, "Team 1");
        assert_eq!(team.color, "#FF6B6B");
        assert!(team.player_ids.is_empty());
    }

    #[test]
    fn each_join_creates_a_numbered_team() {
        let mut session = lobby();
        session.join("Bob".into(), "#4ECDC4".into()).unwrap();
        session.join("Cy".into(), "#45B7D1".into()).unwrap();

        let names: Vec<_> = session.teams.values().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Team 1", "Team 2", "Team 3"]);
        let colors: Vec<_> = session.teams.values().map(|t| t.color.as_str()).collect();
        assert_eq!(colors, vec!["#FF6B6B", "#4ECDC4", "#45B7D1"]);
    }

    #[test]
    fn join_is_rejected_outside_lobby() {
        let mut session = lobby();
        session.status = GameStatus::SubmittingQuestions;
        let err = session.join("Late".into(), "#000".into()).unwrap_err();
        assert_eq!(err, ServiceError::Rejected(Rejection::WrongPhase));
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn switching_team_moves_membership() {
        let mut session = lobby();
        let admin = session.admin_id;
        let team_ids: Vec<_> = {
            session.join("Bob".into(), "#4ECDC4".into()).unwrap();
            session.teams.keys().copied().collect()
        };

        session.switch_team(admin, team_ids[0]).unwrap();
        assert_eq!(session.teams[&team_ids[0]].player_ids, vec![admin]);

        session.switch_team(admin, team_ids[1]).unwrap();
        assert!(session.teams[&team_ids[0]].player_ids.is_empty());
        assert_eq!(session.teams[&team_ids[1]].player_ids, vec![admin]);
        assert_eq!(session.players[&admin].team_id, Some(team_ids[1]));
    }

    #[test]
    fn switching_to_unknown_team_or_player_is_not_found() {
        let mut session = lobby();
        let admin = session.admin_id;
        let team = *session.teams.keys().next().unwrap();

        assert_eq!(
            session.switch_team(admin, Uuid::new_v4()).unwrap_err(),
            ServiceError::NotFound(Missing::Team)
        );
        assert_eq!(
            session.switch_team(Uuid::new_v4(), team).unwrap_err(),
            ServiceError::NotFound(Missing::Player)
        );
    }

    #[test]
    fn config_patch_replaces_scoring_wholesale() {
        let mut session = lobby();
        let admin = session.admin_id;

        session
            .update_config(
                admin,
                GameConfigPatch {
                    questions_per_team: Some(4),
                    scoring: Some(ScoringConfig {
                        correct_answer: 1,
                        question_answered: 2,
                        question_unanswered: 0,
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(session.config.questions_per_team, 4);
        assert_eq!(session.config.questions_per_turn, 2);
        assert_eq!(session.config.scoring.question_unanswered, 0);
        assert_eq!(session.config.scoring.correct_answer, 1);
    }

    #[test]
    fn config_updates_are_admin_and_lobby_only() {
        let mut session = lobby();
        let bob = session.join("Bob".into(), "#4ECDC4".into()).unwrap();

        let err = session
            .update_config(bob, GameConfigPatch::default())
            .unwrap_err();
        assert_eq!(err, ServiceError::Rejected(Rejection::NotAdmin));

        let admin = session.admin_id;
        let err = session
            .update_config(
                admin,
                GameConfigPatch {
                    questions_per_turn: Some(0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, ServiceError::Rejected(Rejection::InvalidConfig));
        assert_eq!(session.config.questions_per_turn, 2);

        session.status = GameStatus::Finished;
        let err = session
            .update_config(admin, GameConfigPatch::default())
            .unwrap_err();
        assert_eq!(err, ServiceError::Rejected(Rejection::WrongPhase));
    }

    #[test]
    fn total_turns_rounds_up() {
        let mut config = GameConfig::default();
        assert_eq!(config.total_turns(), 3);
        config.questions_per_team = 5;
        assert_eq!(config.total_turns(), 3);
        config.questions_per_turn = 5;
        assert_eq!(config.total_turns(), 1);
    }
}
