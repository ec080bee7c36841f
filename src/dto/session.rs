//! JSON view of a session, as pushed to clients on every update.
//!
//! Field names are camelCase and every set is rendered as a sorted array so the payload is
//! deterministic for a given session state.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::epoch_millis,
    state::{
        game::{
            GameConfig, GameResults, GameSession, PhaseClock, Player, Question, QuestionDraft,
            QuestionInPlay, QuestionResult, SkipVote, Team, TeamAnswer, Turn,
        },
        proposal::{Proposal, ProposalList},
        state_machine::GameStatus,
    },
};

/// Complete, JSON-safe state of one session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Player allowed to configure, start, replay and delete the session.
    pub admin_id: Uuid,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Number of games started in this session.
    pub game_number: u32,
    /// Rules applied to the next or current game.
    pub config: GameConfig,
    /// Players keyed by id, in join order.
    pub players: IndexMap<Uuid, PlayerView>,
    /// Teams keyed by id, in numbering order.
    pub teams: IndexMap<Uuid, TeamView>,
    /// Question proposals of each team, in submission order.
    pub question_proposals: IndexMap<Uuid, Vec<QuestionProposalView>>,
    /// Start of question authoring, in epoch milliseconds.
    pub timer_started_at: Option<i64>,
    /// Length of question authoring, in seconds.
    pub timer_duration: Option<u64>,
    /// End of question authoring, in epoch milliseconds.
    pub timer_ends_at: Option<i64>,
    /// Finalized questions of each team, in play order.
    pub questions: IndexMap<Uuid, Vec<QuestionView>>,
    /// Active answering turn, `null` outside of answering.
    #[serialize_always]
    pub current_turn: Option<TurnView>,
    /// Answer proposals of each team for the current turn, keyed by question.
    pub answer_proposals: IndexMap<Uuid, IndexMap<Uuid, Vec<AnswerProposalView>>>,
    /// Collected answers: answering team, then question, then chosen index.
    pub answers: IndexMap<Uuid, IndexMap<Uuid, Option<usize>>>,
    /// Skip-vote tallies, `null` when no timed phase is running.
    #[serialize_always]
    pub skip_votes: Option<SkipVotesView>,
    /// Scores and breakdown, `null` until the game is finished.
    #[serialize_always]
    pub results: Option<ResultsView>,
}

/// Public view of a player.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// `null` until the player picks a team.
    pub team_id: Option<Uuid>,
}

/// Public view of a team.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    /// Team identifier.
    pub id: Uuid,
    /// Display name, e.g. `Team 2`.
    pub name: String,
    /// CSS color.
    pub color: String,
    /// Members in the order they joined the team.
    pub player_ids: Vec<Uuid>,
    /// Final score of the last finished game.
    pub score: i32,
}

/// Question proposal with its current upvoters.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionProposalView {
    /// Proposal identifier.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Answer choices.
    pub choices: Vec<String>,
    /// Index of the correct choice.
    pub correct_index: usize,
    /// Player who submitted the proposal.
    pub submitted_by: Uuid,
    /// Players currently upvoting, sorted.
    pub upvotes: Vec<Uuid>,
}

/// Answer proposal with its current upvoters.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerProposalView {
    /// Proposal identifier.
    pub id: Uuid,
    /// Proposed choice index.
    pub choice_index: usize,
    /// Player who submitted the proposal.
    pub submitted_by: Uuid,
    /// Players currently upvoting, sorted.
    pub upvotes: Vec<Uuid>,
}

/// Finalized question.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Answer choices.
    pub choices: Vec<String>,
    /// Index of the correct choice.
    pub correct_index: usize,
}

/// Question played during a turn.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInPlayView {
    /// Question identifier.
    pub question_id: Uuid,
    /// Team that authored the question.
    pub from_team: Uuid,
}

/// Current answering turn with its countdown bounds.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    /// 1-based turn number.
    pub number: u32,
    /// Questions in presentation order.
    pub questions_in_play: Vec<QuestionInPlayView>,
    /// Turn start, in epoch milliseconds.
    pub timer_started_at: i64,
    /// Seconds.
    pub timer_duration: u64,
    /// Turn end, in epoch milliseconds.
    pub timer_ends_at: i64,
}

/// Skip-vote tallies of every team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkipVotesView {
    /// Tally per team.
    pub teams: IndexMap<Uuid, SkipVoteView>,
}

/// Skip-vote tally of one team.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkipVoteView {
    /// Whether the team reached its internal majority.
    pub voted: bool,
    /// Players voting to skip, sorted.
    pub skip_voters: Vec<Uuid>,
}

/// Post-game results.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    /// Breakdown of every finalized question.
    pub questions: Vec<QuestionResultView>,
    /// Total score per team.
    pub final_scores: IndexMap<Uuid, i32>,
}

/// Scoring breakdown of one question.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResultView {
    /// The question itself.
    pub question: QuestionView,
    /// Team that authored the question.
    pub from_team: Uuid,
    /// What each answering team chose.
    pub team_answers: IndexMap<Uuid, TeamAnswerView>,
    /// Answering teams that picked the correct choice.
    pub correct_count: usize,
    /// Number of answering teams.
    pub total_answering: usize,
    /// `correctCount / totalAnswering`, between 0 and 1.
    pub correct_percentage: f64,
    /// Points credited to the authoring team.
    pub question_points: i32,
}

/// What one answering team chose for a question.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamAnswerView {
    /// `null` when the team never proposed an answer.
    pub choice_index: Option<usize>,
    /// Whether the choice was the correct one.
    pub correct: bool,
}

fn sorted(voters: &HashSet<Uuid>) -> Vec<Uuid> {
    let mut voters: Vec<Uuid> = voters.iter().copied().collect();
    voters.sort();
    voters
}

impl From<&GameSession> for SessionSnapshot {
    fn from(session: &GameSession) -> Self {
        let submission = session.submission_clock;

        Self {
            id: session.id,
            admin_id: session.admin_id,
            status: session.status,
            created_at: epoch_millis(session.created_at),
            game_number: session.game_number,
            config: session.config.clone(),
            players: session
                .players
                .iter()
                .map(|(id, player)| (*id, player.into()))
                .collect(),
            teams: session
                .teams
                .iter()
                .map(|(id, team)| (*id, team.into()))
                .collect(),
            question_proposals: session
                .question_proposals
                .iter()
                .map(|(team_id, list)| (*team_id, question_proposals(list)))
                .collect(),
            timer_started_at: submission.map(|clock| epoch_millis(clock.started_at)),
            timer_duration: submission.map(|clock| clock.duration.as_secs()),
            timer_ends_at: submission.map(|clock| epoch_millis(clock.ends_at)),
            questions: session
                .questions
                .iter()
                .map(|(team_id, list)| (*team_id, list.iter().map(QuestionView::from).collect()))
                .collect(),
            current_turn: session.current_turn.as_ref().map(TurnView::from),
            answer_proposals: session
                .answer_proposals
                .iter()
                .map(|(team_id, by_question)| {
                    let by_question = by_question
                        .iter()
                        .map(|(question_id, list)| (*question_id, answer_proposals(list)))
                        .collect();
                    (*team_id, by_question)
                })
                .collect(),
            answers: session.answers.clone(),
            skip_votes: session.skip_votes.as_ref().map(|votes| SkipVotesView {
                teams: votes
                    .iter()
                    .map(|(team_id, vote)| (*team_id, vote.into()))
                    .collect(),
            }),
            results: session.results.as_ref().map(ResultsView::from),
        }
    }
}

fn question_proposals(list: &ProposalList<QuestionDraft>) -> Vec<QuestionProposalView> {
    list.iter()
        .map(|proposal: &Proposal<QuestionDraft>| QuestionProposalView {
            id: proposal.id,
            text: proposal.payload.text.clone(),
            choices: proposal.payload.choices.clone(),
            correct_index: proposal.payload.correct_index,
            submitted_by: proposal.submitted_by,
            upvotes: sorted(&proposal.upvoters),
        })
        .collect()
}

fn answer_proposals(list: &ProposalList<usize>) -> Vec<AnswerProposalView> {
    list.iter()
        .map(|proposal| AnswerProposalView {
            id: proposal.id,
            choice_index: proposal.payload,
            submitted_by: proposal.submitted_by,
            upvotes: sorted(&proposal.upvoters),
        })
        .collect()
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            team_id: player.team_id,
        }
    }
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            color: team.color.clone(),
            player_ids: team.player_ids.clone(),
            score: team.score,
        }
    }
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            choices: question.choices.clone(),
            correct_index: question.correct_index,
        }
    }
}

impl From<&QuestionInPlay> for QuestionInPlayView {
    fn from(in_play: &QuestionInPlay) -> Self {
        Self {
            question_id: in_play.question_id,
            from_team: in_play.from_team,
        }
    }
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        let PhaseClock {
            started_at,
            duration,
            ends_at,
        } = turn.clock;

        Self {
            number: turn.number,
            questions_in_play: turn
                .questions_in_play
                .iter()
                .map(QuestionInPlayView::from)
                .collect(),
            timer_started_at: epoch_millis(started_at),
            timer_duration: duration.as_secs(),
            timer_ends_at: epoch_millis(ends_at),
        }
    }
}

impl From<&SkipVote> for SkipVoteView {
    fn from(vote: &SkipVote) -> Self {
        Self {
            voted: vote.voted,
            skip_voters: sorted(&vote.skip_voters),
        }
    }
}

impl From<&GameResults> for ResultsView {
    fn from(results: &GameResults) -> Self {
        Self {
            questions: results.questions.iter().map(QuestionResultView::from).collect(),
            final_scores: results.final_scores.clone(),
        }
    }
}

impl From<&QuestionResult> for QuestionResultView {
    fn from(result: &QuestionResult) -> Self {
        Self {
            question: (&result.question).into(),
            from_team: result.from_team,
            team_answers: result
                .team_answers
                .iter()
                .map(|(team_id, answer)| (*team_id, answer.into()))
                .collect(),
            correct_count: result.correct_count,
            total_answering: result.total_answering,
            correct_percentage: result.correct_percentage,
            question_points: result.question_points,
        }
    }
}

impl From<&TeamAnswer> for TeamAnswerView {
    fn from(answer: &TeamAnswer) -> Self {
        Self {
            choice_index: answer.choice_index,
            correct: answer.correct,
        }
    }
}
