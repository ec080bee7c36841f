use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Players join and pick teams; the admin may tune the rules.
    Lobby,
    /// Teams author and upvote their questions.
    SubmittingQuestions,
    /// Teams answer the questions in play for the current turn.
    AnsweringTurn,
    /// Scores are computed and results are available.
    Finished,
}

/// Events that can be applied to the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Admin starts the game from the lobby.
    StartGame,
    /// A new answering turn begins (first turn or follow-up).
    TurnStarted,
    /// The last turn closed and scores were computed.
    Finish,
    /// Admin resets a finished game back to the lobby.
    Replay,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the session was in when the invalid event was received.
    pub from: GameStatus,
    /// The event that cannot be applied from this status.
    pub event: GameEvent,
}

impl GameStatus {
    /// Compute the status reached by applying `event`, if the transition is valid.
    pub fn next(self, event: GameEvent) -> Result<GameStatus, InvalidTransition> {
        let next = match (self, event) {
            (GameStatus::Lobby, GameEvent::StartGame) => GameStatus::SubmittingQuestions,
            (GameStatus::SubmittingQuestions, GameEvent::TurnStarted) => GameStatus::AnsweringTurn,
            (GameStatus::AnsweringTurn, GameEvent::TurnStarted) => GameStatus::AnsweringTurn,
            (GameStatus::AnsweringTurn, GameEvent::Finish) => GameStatus::Finished,
            (GameStatus::Finished, GameEvent::Replay) => GameStatus::Lobby,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Whether a phase timer and skip votes are meaningful in this status.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            GameStatus::SubmittingQuestions | GameStatus::AnsweringTurn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(status: &mut GameStatus, event: GameEvent) -> GameStatus {
        *status = status.next(event).unwrap();
        *status
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut status = GameStatus::Lobby;

        assert_eq!(
            apply(&mut status, GameEvent::StartGame),
            GameStatus::SubmittingQuestions
        );
        assert_eq!(
            apply(&mut status, GameEvent::TurnStarted),
            GameStatus::AnsweringTurn
        );
        assert_eq!(
            apply(&mut status, GameEvent::TurnStarted),
            GameStatus::AnsweringTurn
        );
        assert_eq!(apply(&mut status, GameEvent::Finish), GameStatus::Finished);
        assert_eq!(apply(&mut status, GameEvent::Replay), GameStatus::Lobby);
    }

    #[test]
    fn skipping_or_reversing_is_rejected() {
        let cases = [
            (GameStatus::Lobby, GameEvent::TurnStarted),
            (GameStatus::Lobby, GameEvent::Finish),
            (GameStatus::Lobby, GameEvent::Replay),
            (GameStatus::SubmittingQuestions, GameEvent::StartGame),
            (GameStatus::SubmittingQuestions, GameEvent::Finish),
            (GameStatus::SubmittingQuestions, GameEvent::Replay),
            (GameStatus::AnsweringTurn, GameEvent::StartGame),
            (GameStatus::AnsweringTurn, GameEvent::Replay),
            (GameStatus::Finished, GameEvent::StartGame),
            (GameStatus::Finished, GameEvent::TurnStarted),
            (GameStatus::Finished, GameEvent::Finish),
        ];

        for (from, event) in cases {
            let err = from.next(event).unwrap_err();
            assert_eq!(err, InvalidTransition { from, event });
        }
    }

    #[test]
    fn only_question_and_answer_phases_are_timed() {
        assert!(!GameStatus::Lobby.is_timed());
        assert!(GameStatus::SubmittingQuestions.is_timed());
        assert!(GameStatus::AnsweringTurn.is_timed());
        assert!(!GameStatus::Finished.is_timed());
    }
}
