//! Final scoring pass: correct guesses for answering teams, calibration bonus for authors.

use indexmap::IndexMap;

use crate::state::game::{
    GameResults, Question, QuestionId, QuestionResult, ScoringConfig, Team, TeamAnswer, TeamId,
};

/// Lower bound of the well-calibrated correctness band.
const SWEET_SPOT_MIN: f64 = 0.33;
/// Upper bound of the well-calibrated correctness band.
const SWEET_SPOT_MAX: f64 = 0.66;
/// Distance from 50% at which the bonus falls to half credit.
const SWEET_SPOT_HALF_WIDTH: f64 = 0.16;

/// Compute per-question breakdowns and per-team totals.
pub fn score_game(
    teams: &IndexMap<TeamId, Team>,
    questions: &IndexMap<TeamId, Vec<Question>>,
    answers: &IndexMap<TeamId, IndexMap<QuestionId, Option<usize>>>,
    scoring: &ScoringConfig,
) -> GameResults {
    let mut final_scores: IndexMap<TeamId, i32> = teams.keys().map(|id| (*id, 0)).collect();
    let mut results = Vec::new();

    for author in teams.keys() {
        let Some(authored) = questions.get(author) else {
            continue;
        };

        for question in authored {
            let mut team_answers = IndexMap::new();
            let mut correct_count = 0;

            for answering in teams.keys().filter(|id| *id != author) {
                let choice_index = answers
                    .get(answering)
                    .and_then(|by_question| by_question.get(&question.id))
                    .copied()
                    .flatten();
                let correct = choice_index == Some(question.correct_index);

                if correct {
                    correct_count += 1;
                    if let Some(score) = final_scores.get_mut(answering) {
                        *score += scoring.correct_answer;
                    }
                }
                team_answers.insert(
                    *answering,
                    TeamAnswer {
                        choice_index,
                        correct,
                    },
                );
            }

            let total_answering = teams.len().saturating_sub(1);
            let correct_percentage = if total_answering > 0 {
                correct_count as f64 / total_answering as f64
            } else {
                0.0
            };
            let question_points = author_points(correct_percentage, scoring);
            if let Some(score) = final_scores.get_mut(author) {
                *score += question_points;
            }

            results.push(QuestionResult {
                question: question.clone(),
                from_team: *author,
                team_answers,
                correct_count,
                total_answering,
                correct_percentage,
                question_points,
            });
        }
    }

    GameResults {
        questions: results,
        final_scores,
    }
}

/// Credit earned by the author of a question answered correctly by `correct_percentage` of
/// the other teams.
///
/// Inside the sweet spot the reward falls off linearly from full credit at 50% to half credit
/// at the band edges. Outside it, the question was either too easy or too hard and the author
/// receives `question_unanswered`.
pub fn author_points(correct_percentage: f64, scoring: &ScoringConfig) -> i32 {
    if !(SWEET_SPOT_MIN..=SWEET_SPOT_MAX).contains(&correct_percentage) {
        return scoring.question_unanswered;
    }

    let distance = (correct_percentage - 0.5).abs();
    let multiplier = 1.0 - (distance / SWEET_SPOT_HALF_WIDTH) * 0.5;
    round_half_up(f64::from(scoring.question_answered) * multiplier)
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
