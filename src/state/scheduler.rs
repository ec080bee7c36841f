//! Phase scheduling for a session: starting, question finalization, turn construction,
//! answer collection, skip votes and replay.
//!
//! Every method here is synchronous and operates on a locked [`GameSession`]. Methods that enter
//! a timed phase hand back a [`PhaseTimer`]; the caller is responsible for arming it and for
//! feeding it back through [`GameSession::fire_timer`] once it expires.

use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use rand::{Rng, seq::SliceRandom};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{Missing, Rejection, ServiceError},
    state::{
        game::{
            GameSession, PhaseClock, PlayerId, ProposalId, Question, QuestionDraft, QuestionId,
            QuestionInPlay, SkipVote, TeamId, Turn,
        },
        proposal::ProposalList,
        scoring,
        state_machine::{GameEvent, GameStatus},
    },
};

const PLACEHOLDER_CHOICE: &str = "Correct Answer";

/// Timed phase a timer was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedPhase {
    /// Question authoring.
    QuestionSubmission,
    /// Answering during the given turn number.
    Answering {
        /// Turn number active when the timer was armed.
        turn: u32,
    },
}

/// Identity of the phase a timer belongs to, checked again when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTag {
    /// Value of [`GameSession::game_number`] when armed.
    pub game_number: u32,
    /// Phase the timer is meant to close.
    pub phase: TimedPhase,
}

/// Request to close a phase after `duration` unless something else closes it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimer {
    /// Phase the timer closes.
    pub tag: TimerTag,
    /// Delay before the timer fires.
    pub duration: Duration,
}

/// What happened when a timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFired {
    /// The phase had already moved on; nothing was touched.
    Stale,
    /// The phase was closed; a follow-up timer is returned when a new timed phase began.
    Advanced(Option<PhaseTimer>),
}

impl GameSession {
    /// Leave the lobby and open question authoring.
    pub fn start_game(
        &mut self,
        player_id: PlayerId,
        now: SystemTime,
    ) -> Result<PhaseTimer, ServiceError> {
        self.ensure_admin(player_id)?;
        let next = self.status.next(GameEvent::StartGame)?;

        if self.players.len() < 2 {
            return Err(Rejection::NotEnoughPlayers.into());
        }
        if self.players.values().any(|player| player.team_id.is_none()) {
            return Err(Rejection::PlayersWithoutTeam.into());
        }

        self.teams.retain(|_, team| !team.player_ids.is_empty());
        self.question_proposals = self
            .teams
            .keys()
            .map(|id| (*id, ProposalList::new()))
            .collect();
        self.skip_votes = Some(self.fresh_skip_votes());
        self.game_number += 1;
        self.status = next;

        let clock = PhaseClock::starting(now, self.config.question_submit_timer);
        self.submission_clock = Some(clock);

        info!(
            session_id = %self.id,
            teams = self.teams.len(),
            game_number = self.game_number,
            "question submission started"
        );

        Ok(PhaseTimer {
            tag: TimerTag {
                game_number: self.game_number,
                phase: TimedPhase::QuestionSubmission,
            },
            duration: clock.duration,
        })
    }

    /// Add a question proposal to the player's team list.
    pub fn submit_question(
        &mut self,
        player_id: PlayerId,
        draft: QuestionDraft,
    ) -> Result<ProposalId, ServiceError> {
        self.ensure_status(GameStatus::SubmittingQuestions)?;
        let team_id = self.team_of(player_id)?;

        let QuestionDraft {
            text,
            choices,
            correct_index,
        } = draft;
        let text = text.trim().to_string();
        if text.is_empty() || choices.len() < 2 || choices.len() > self.config.max_choices {
            return Err(Rejection::InvalidQuestion.into());
        }
        if correct_index >= choices.len() {
            return Err(Rejection::InvalidCorrectIndex.into());
        }
        let choices = choices
            .iter()
            .map(|choice| choice.trim().to_string())
            .collect();

        Ok(self
            .question_proposals
            .entry(team_id)
            .or_default()
            .propose(
                player_id,
                QuestionDraft {
                    text,
                    choices,
                    correct_index,
                },
            ))
    }

    /// Toggle the player's upvote on one of their team's question proposals.
    pub fn upvote_question(
        &mut self,
        player_id: PlayerId,
        proposal_id: ProposalId,
    ) -> Result<(), ServiceError> {
        self.ensure_status(GameStatus::SubmittingQuestions)?;
        let team_id = self.team_of(player_id)?;

        let toggled = self
            .question_proposals
            .get_mut(&team_id)
            .is_some_and(|list| list.toggle_upvote(proposal_id, player_id));
        if !toggled {
            return Err(Missing::Proposal.into());
        }
        Ok(())
    }

    /// Propose an answer on behalf of the player's team.
    pub fn submit_answer(
        &mut self,
        player_id: PlayerId,
        question_id: QuestionId,
        choice_index: usize,
    ) -> Result<ProposalId, ServiceError> {
        self.ensure_status(GameStatus::AnsweringTurn)?;
        let team_id = self.team_of(player_id)?;

        Ok(self
            .answer_proposals
            .entry(team_id)
            .or_default()
            .entry(question_id)
            .or_default()
            .propose(player_id, choice_index))
    }

    /// Toggle the player's upvote on one of their team's answer proposals.
    pub fn upvote_answer(
        &mut self,
        player_id: PlayerId,
        question_id: QuestionId,
        proposal_id: ProposalId,
    ) -> Result<(), ServiceError> {
        self.ensure_status(GameStatus::AnsweringTurn)?;
        let team_id = self.team_of(player_id)?;

        let toggled = self
            .answer_proposals
            .get_mut(&team_id)
            .and_then(|by_question| by_question.get_mut(&question_id))
            .is_some_and(|list| list.toggle_upvote(proposal_id, player_id));
        if !toggled {
            return Err(Missing::Proposal.into());
        }
        Ok(())
    }

    /// Toggle the player's skip vote and close the phase once enough teams agree.
    ///
    /// Returns the timer of the phase that replaced the closed one, if any.
    pub fn vote_skip<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        rng: &mut R,
        now: SystemTime,
    ) -> Result<Option<PhaseTimer>, ServiceError> {
        if !self.status.is_timed() {
            return Err(Rejection::WrongPhase.into());
        }
        let team_id = self.team_of(player_id)?;
        let member_count = self
            .teams
            .get(&team_id)
            .map(|team| team.player_ids.len())
            .unwrap_or_default();

        if self.skip_votes.is_none() {
            self.skip_votes = Some(self.fresh_skip_votes());
        }
        let team_count = self.teams.len();
        let Some(votes) = self.skip_votes.as_mut() else {
            return Ok(None);
        };

        let vote = votes.entry(team_id).or_default();
        if !vote.skip_voters.remove(&player_id) {
            vote.skip_voters.insert(player_id);
        }
        vote.voted = vote.skip_voters.len() >= majority(member_count, self.config.skip_member_majority);

        let teams_voted = votes.values().filter(|vote| vote.voted).count();
        if teams_voted < majority(team_count, self.config.skip_team_majority) {
            return Ok(None);
        }

        info!(session_id = %self.id, status = ?self.status, "skip vote reached majority");
        self.close_current_phase(rng, now)
    }

    /// Reset a finished game to the lobby, keeping players and team membership.
    pub fn replay(&mut self, player_id: PlayerId) -> Result<(), ServiceError> {
        self.ensure_admin(player_id)?;
        let next = self.status.next(GameEvent::Replay)?;

        self.question_proposals.clear();
        self.submission_clock = None;
        self.questions.clear();
        self.current_turn = None;
        self.answer_proposals.clear();
        self.answers.clear();
        self.results = None;
        self.skip_votes = None;
        for team in self.teams.values_mut() {
            team.score = 0;
        }
        self.status = next;

        info!(session_id = %self.id, "game reset to lobby");
        Ok(())
    }

    /// Act on an expired timer, unless the phase it was armed for is already over.
    pub fn fire_timer<R: Rng + ?Sized>(
        &mut self,
        tag: TimerTag,
        rng: &mut R,
        now: SystemTime,
    ) -> TimerFired {
        if !self.is_current(tag) {
            return TimerFired::Stale;
        }

        match self.close_current_phase(rng, now) {
            Ok(next) => TimerFired::Advanced(next),
            Err(err) => {
                warn!(session_id = %self.id, error = %err, "timer could not close the phase");
                TimerFired::Stale
            }
        }
    }

    /// Whether `tag` still designates the phase the session is in.
    pub fn is_current(&self, tag: TimerTag) -> bool {
        if tag.game_number != self.game_number {
            return false;
        }

        match tag.phase {
            TimedPhase::QuestionSubmission => self.status == GameStatus::SubmittingQuestions,
            TimedPhase::Answering { turn } => {
                self.status == GameStatus::AnsweringTurn
                    && self.current_turn.as_ref().map(|t| t.number) == Some(turn)
            }
        }
    }

    fn close_current_phase<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: SystemTime,
    ) -> Result<Option<PhaseTimer>, ServiceError> {
        match self.status {
            GameStatus::SubmittingQuestions => {
                self.finalize_questions(rng);
                self.start_next_turn(rng, now)
            }
            GameStatus::AnsweringTurn => {
                self.collect_answers();
                self.start_next_turn(rng, now)
            }
            GameStatus::Lobby | GameStatus::Finished => Err(Rejection::WrongPhase.into()),
        }
    }

    /// Freeze each team's top proposals, padding with placeholders, then shuffle each list.
    fn finalize_questions<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let quota = self.config.questions_per_team;
        let mut finalized = IndexMap::with_capacity(self.teams.len());

        for (team_id, team) in &self.teams {
            let mut selected: Vec<Question> = self
                .question_proposals
                .get(team_id)
                .map(|list| {
                    list.ranked()
                        .into_iter()
                        .take(quota)
                        .map(|proposal| Question {
                            id: proposal.id,
                            text: proposal.payload.text.clone(),
                            choices: proposal.payload.choices.clone(),
                            correct_index: proposal.payload.correct_index,
                        })
                        .collect()
                })
                .unwrap_or_default();

            while selected.len() < quota {
                let slot = selected.len() + 1;
                selected.push(Question {
                    id: Uuid::new_v4(),
                    text: format!("Default Question {slot} for {}", team.name),
                    choices: vec![PLACEHOLDER_CHOICE.to_string()],
                    correct_index: 0,
                });
            }

            selected.shuffle(rng);
            finalized.insert(*team_id, selected);
        }

        self.questions = finalized;
    }

    /// Record each team's winning answer for every question in play it did not author.
    fn collect_answers(&mut self) {
        let Some(turn) = self.current_turn.as_ref() else {
            return;
        };

        for team_id in self.teams.keys() {
            let recorded = self.answers.entry(*team_id).or_default();
            for in_play in turn
                .questions_in_play
                .iter()
                .filter(|in_play| in_play.from_team != *team_id)
            {
                let winner = self
                    .answer_proposals
                    .get(team_id)
                    .and_then(|by_question| by_question.get(&in_play.question_id))
                    .and_then(|list| list.pick_winner())
                    .copied();
                recorded.insert(in_play.question_id, winner);
            }
        }
    }

    /// Open the next answering turn, or finish the game once every turn was played.
    fn start_next_turn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: SystemTime,
    ) -> Result<Option<PhaseTimer>, ServiceError> {
        let number = self.current_turn.as_ref().map_or(1, |turn| turn.number + 1);
        if number > self.config.total_turns() {
            self.finish()?;
            return Ok(None);
        }
        let next = self.status.next(GameEvent::TurnStarted)?;

        let per_turn = self.config.questions_per_turn;
        let offset = (number as usize - 1) * per_turn;
        let mut questions_in_play: Vec<QuestionInPlay> = self
            .teams
            .keys()
            .filter_map(|team_id| self.questions.get(team_id).map(|list| (team_id, list)))
            .flat_map(|(team_id, list)| {
                list.iter()
                    .skip(offset)
                    .take(per_turn)
                    .map(move |question| QuestionInPlay {
                        question_id: question.id,
                        from_team: *team_id,
                    })
            })
            .collect();
        questions_in_play.shuffle(rng);

        let clock = PhaseClock::starting(now, self.config.answer_timer);
        self.current_turn = Some(Turn {
            number,
            questions_in_play,
            clock,
        });
        self.status = next;
        self.skip_votes = Some(self.fresh_skip_votes());
        self.answer_proposals = self
            .teams
            .keys()
            .map(|id| (*id, IndexMap::new()))
            .collect();

        info!(session_id = %self.id, turn = number, "answering turn started");

        Ok(Some(PhaseTimer {
            tag: TimerTag {
                game_number: self.game_number,
                phase: TimedPhase::Answering { turn: number },
            },
            duration: clock.duration,
        }))
    }

    fn finish(&mut self) -> Result<(), ServiceError> {
        let next = self.status.next(GameEvent::Finish)?;

        let results = scoring::score_game(
            &self.teams,
            &self.questions,
            &self.answers,
            &self.config.scoring,
        );
        for (team_id, team) in self.teams.iter_mut() {
            team.score = results
                .final_scores
                .get(team_id)
                .copied()
                .unwrap_or_default();
        }
        self.results = Some(results);
        self.skip_votes = None;
        self.status = next;

        info!(session_id = %self.id, "game finished");
        Ok(())
    }

    fn ensure_status(&self, expected: GameStatus) -> Result<(), ServiceError> {
        if self.status != expected {
            return Err(Rejection::WrongPhase.into());
        }
        Ok(())
    }

    fn fresh_skip_votes(&self) -> IndexMap<TeamId, SkipVote> {
        self.teams
            .keys()
            .map(|id| (*id, SkipVote::default()))
            .collect()
    }
}

/// Smallest count that reaches `fraction` of `total`.
fn majority(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).ceil() as usize
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::game::{GameConfig, GameConfigPatch};

    struct Table {
        session: GameSession,
        teams: Vec<TeamId>,
        members: Vec<Vec<PlayerId>>,
        rng: StdRng,
    }

    impl Table {
        fn admin(&self) -> PlayerId {
            self.session.admin_id
        }

        fn start(&mut self) -> PhaseTimer {
            let admin = self.admin();
            self.session.start_game(admin, SystemTime::now()).unwrap()
        }

        fn fire(&mut self, timer: PhaseTimer) -> TimerFired {
            self.session
                .fire_timer(timer.tag, &mut self.rng, SystemTime::now())
        }

        fn turn(&self) -> &Turn {
            self.session.current_turn.as_ref().unwrap()
        }
    }

    /// Seat players into teams of the given sizes. The admin is the first player.
    fn table(sizes: &[usize]) -> Table {
        table_with(sizes, GameConfig::default())
    }

    fn table_with(sizes: &[usize], config: GameConfig) -> Table {
        let mut session = GameSession::new("Admin".into(), config, "#FF6B6B".into());
        let total: usize = sizes.iter().sum();
        let mut players = vec![session.admin_id];
        for n in 1..total {
            players.push(session.join(format!("Player {n}"), "#4ECDC4".into()).unwrap());
        }

        let all_teams: Vec<TeamId> = session.teams.keys().copied().collect();
        let mut seats = players.into_iter();
        let mut members = Vec::new();
        for (index, size) in sizes.iter().enumerate() {
            let seated: Vec<PlayerId> = seats.by_ref().take(*size).collect();
            for player in &seated {
                session.switch_team(*player, all_teams[index]).unwrap();
            }
            members.push(seated);
        }

        Table {
            session,
            teams: all_teams[..sizes.len()].to_vec(),
            members,
            rng: StdRng::seed_from_u64(7),
        }
    }

    fn draft(text: &str, choices: &[&str], correct_index: usize) -> QuestionDraft {
        QuestionDraft {
            text: text.into(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            correct_index,
        }
    }

    #[test]
    fn start_requires_admin_players_and_teams() {
        let mut solo = table(&[1]);
        let admin = solo.admin();
        assert_eq!(
            solo.session.start_game(admin, SystemTime::now()).unwrap_err(),
            ServiceError::Rejected(Rejection::NotEnoughPlayers)
        );

        let mut t = table(&[1]);
        let loner = t.session.join("Loner".into(), "#000".into()).unwrap();
        let admin = t.admin();
        assert_eq!(
            t.session.start_game(loner, SystemTime::now()).unwrap_err(),
            ServiceError::Rejected(Rejection::NotAdmin)
        );
        assert_eq!(
            t.session.start_game(admin, SystemTime::now()).unwrap_err(),
            ServiceError::Rejected(Rejection::PlayersWithoutTeam)
        );
        assert_eq!(t.session.status, GameStatus::Lobby);
        assert_eq!(t.session.teams.len(), 2);
    }

    #[test]
    fn start_prunes_empty_teams_and_arms_submission_timer() {
        let mut t = table(&[2, 1]);
        assert_eq!(t.session.teams.len(), 3);

        let timer = t.start();

        assert_eq!(t.session.status, GameStatus::SubmittingQuestions);
        assert_eq!(
            t.session.teams.keys().copied().collect::<Vec<_>>(),
            t.teams
        );
        assert_eq!(t.session.question_proposals.len(), 2);
        assert!(t.session.question_proposals.values().all(|l| l.is_empty()));
        assert_eq!(timer.duration, Duration::from_secs(300));
        assert_eq!(
            timer.tag,
            TimerTag {
                game_number: 1,
                phase: TimedPhase::QuestionSubmission
            }
        );
        let clock = t.session.submission_clock.unwrap();
        assert_eq!(clock.ends_at, clock.started_at + clock.duration);

        let admin = t.admin();
        assert_eq!(
            t.session.start_game(admin, SystemTime::now()).unwrap_err(),
            ServiceError::Rejected(Rejection::WrongPhase)
        );
    }

    #[test]
    fn question_proposals_are_validated_and_trimmed() {
        let mut t = table(&[1, 1]);
        let author = t.members[0][0];
        assert_eq!(
            t.session
                .submit_question(author, draft("Too early", &["a", "b"], 0))
                .unwrap_err(),
            ServiceError::Rejected(Rejection::WrongPhase)
        );
        t.start();

        let rejected = [
            (draft("   ", &["a", "b"], 0), Rejection::InvalidQuestion),
            (draft("One choice", &["a"], 0), Rejection::InvalidQuestion),
            (
                draft("Too many", &["a", "b", "c", "d", "e"], 0),
                Rejection::InvalidQuestion,
            ),
            (draft("Bad index", &["a", "b"], 2), Rejection::InvalidCorrectIndex),
        ];
        for (question, reason) in rejected {
            assert_eq!(
                t.session.submit_question(author, question).unwrap_err(),
                ServiceError::Rejected(reason)
            );
        }

        let id = t
            .session
            .submit_question(author, draft("  Largest planet? ", &[" Jupiter ", "Mars"], 0))
            .unwrap();
        let list = &t.session.question_proposals[&t.teams[0]];
        let proposal = list.iter().next().unwrap();
        assert_eq!(proposal.id, id);
        assert_eq!(proposal.payload.text, "Largest planet?");
        assert_eq!(proposal.payload.choices, vec!["Jupiter", "Mars"]);
    }

    #[test]
    fn upvotes_stay_within_the_team() {
        let mut t = table(&[2, 1]);
        t.start();
        let (author, teammate, rival) = (t.members[0][0], t.members[0][1], t.members[1][0]);
        let id = t
            .session
            .submit_question(author, draft("Q", &["a", "b"], 1))
            .unwrap();

        t.session.upvote_question(teammate, id).unwrap();
        assert_eq!(
            t.session.question_proposals[&t.teams[0]]
                .iter()
                .next()
                .unwrap()
                .upvoters
                .len(),
            2
        );
        assert_eq!(
            t.session.upvote_question(rival, id).unwrap_err(),
            ServiceError::NotFound(Missing::Proposal)
        );
    }

    #[test]
    fn finalization_pads_and_turns_slice_each_list() {
        let mut t = table(&[1, 1]);
        let submission = t.start();
        let author = t.members[0][0];
        let first = t
            .session
            .submit_question(author, draft("Q1", &["a", "b"], 0))
            .unwrap();
        let second = t
            .session
            .submit_question(author, draft("Q2", &["a", "b"], 1))
            .unwrap();

        let timer = match t.fire(submission) {
            TimerFired::Advanced(Some(timer)) => timer,
            other => panic!("expected a turn timer, got {other:?}"),
        };
        assert_eq!(timer.tag.phase, TimedPhase::Answering { turn: 1 });
        assert_eq!(timer.duration, Duration::from_secs(60));
        assert_eq!(t.session.status, GameStatus::AnsweringTurn);

        for team_id in &t.teams {
            assert_eq!(t.session.questions[team_id].len(), 6);
        }
        let authored: Vec<_> = t.session.questions[&t.teams[0]].iter().map(|q| q.id).collect();
        assert!(authored.contains(&first) && authored.contains(&second));
        let placeholders = &t.session.questions[&t.teams[1]];
        assert!(placeholders.iter().all(|q| {
            q.choices == vec![PLACEHOLDER_CHOICE.to_string()]
                && q.correct_index == 0
                && q.text.ends_with("for Team 2")
        }));

        let mut timer = timer;
        for number in 1..=3u32 {
            let turn = t.turn();
            assert_eq!(turn.number, number);
            assert_eq!(turn.questions_in_play.len(), 4);
            let start = (number as usize - 1) * 2;
            for team_id in &t.teams {
                let mut expected: Vec<QuestionId> = t.session.questions[team_id][start..start + 2]
                    .iter()
                    .map(|q| q.id)
                    .collect();
                let mut played: Vec<QuestionId> = turn
                    .questions_in_play
                    .iter()
                    .filter(|q| q.from_team == *team_id)
                    .map(|q| q.question_id)
                    .collect();
                expected.sort();
                played.sort();
                assert_eq!(played, expected);
            }

            match t.fire(timer) {
                TimerFired::Advanced(Some(next)) => timer = next,
                TimerFired::Advanced(None) => assert_eq!(number, 3),
                TimerFired::Stale => panic!("live timer reported stale"),
            }
        }

        assert_eq!(t.session.status, GameStatus::Finished);
        assert_eq!(t.session.results.as_ref().unwrap().questions.len(), 12);
    }

    #[test]
    fn finalization_keeps_the_most_upvoted_proposals() {
        let mut t = table(&[3, 1]);
        let submission = t.start();
        let [author, second, third] = [t.members[0][0], t.members[0][1], t.members[0][2]];

        let proposals: Vec<ProposalId> = (1..=8)
            .map(|n| {
                t.session
                    .submit_question(author, draft(&format!("Q{n}"), &["a", "b"], 0))
                    .unwrap()
            })
            .collect();
        t.session.upvote_question(second, proposals[7]).unwrap();
        t.session.upvote_question(third, proposals[7]).unwrap();
        t.session.upvote_question(second, proposals[6]).unwrap();

        assert!(matches!(t.fire(submission), TimerFired::Advanced(Some(_))));

        let mut kept: Vec<QuestionId> = t.session.questions[&t.teams[0]]
            .iter()
            .map(|q| q.id)
            .collect();
        let mut expected = vec![
            proposals[7],
            proposals[6],
            proposals[0],
            proposals[1],
            proposals[2],
            proposals[3],
        ];
        kept.sort();
        expected.sort();
        assert_eq!(kept, expected);

        let texts: Vec<&str> = t.session.questions[&t.teams[0]]
            .iter()
            .map(|q| q.text.as_str())
            .collect();
        assert!(!texts.contains(&"Q5") && !texts.contains(&"Q6"));
    }

    #[test]
    fn teams_never_answer_their_own_questions() {
        let config = GameConfig {
            questions_per_team: 1,
            questions_per_turn: 1,
            ..GameConfig::default()
        };
        let mut t = table_with(&[2, 1], config);
        let submission = t.start();
        t.fire(submission);

        let own = t
            .turn()
            .questions_in_play
            .iter()
            .find(|q| q.from_team == t.teams[0])
            .unwrap()
            .question_id;
        let theirs = t
            .turn()
            .questions_in_play
            .iter()
            .find(|q| q.from_team == t.teams[1])
            .unwrap()
            .question_id;

        let (alice, bob) = (t.members[0][0], t.members[0][1]);
        t.session.submit_answer(alice, own, 0).unwrap();
        t.session.submit_answer(alice, theirs, 1).unwrap();
        let preferred = t.session.submit_answer(bob, theirs, 0).unwrap();
        t.session.upvote_answer(alice, theirs, preferred).unwrap();

        let answering = TimerTag {
            game_number: 1,
            phase: TimedPhase::Answering { turn: 1 },
        };
        assert_eq!(
            t.session
                .fire_timer(answering, &mut t.rng, SystemTime::now()),
            TimerFired::Advanced(None)
        );

        let first_team = &t.session.answers[&t.teams[0]];
        assert!(!first_team.contains_key(&own));
        assert_eq!(first_team[&theirs], Some(0));
        assert_eq!(t.session.answers[&t.teams[1]][&own], None);
        for (team_id, answers) in &t.session.answers {
            let authored = &t.session.questions[team_id];
            assert!(authored.iter().all(|q| !answers.contains_key(&q.id)));
        }

        // Placeholder answered correctly by team one: 1 of 1 correct is too easy.
        let scores: Vec<i32> = t.session.teams.values().map(|team| team.score).collect();
        assert_eq!(scores, vec![10 - 3, -3]);
    }

    #[test]
    fn skip_majority_closes_the_phase() {
        let mut t = table(&[2, 1]);
        let submission = t.start();
        let (a1, a2, b1) = (t.members[0][0], t.members[0][1], t.members[1][0]);

        // Two of two members are needed in the first team, and both teams must agree.
        assert_eq!(t.session.vote_skip(a1, &mut t.rng, SystemTime::now()), Ok(None));
        assert_eq!(t.session.vote_skip(b1, &mut t.rng, SystemTime::now()), Ok(None));
        let votes = t.session.skip_votes.as_ref().unwrap();
        assert!(!votes[&t.teams[0]].voted);
        assert!(votes[&t.teams[1]].voted);

        // Toggling off and on again is allowed before the majority is reached.
        assert_eq!(t.session.vote_skip(b1, &mut t.rng, SystemTime::now()), Ok(None));
        assert!(!t.session.skip_votes.as_ref().unwrap()[&t.teams[1]].voted);
        assert_eq!(t.session.vote_skip(b1, &mut t.rng, SystemTime::now()), Ok(None));

        let next = t
            .session
            .vote_skip(a2, &mut t.rng, SystemTime::now())
            .unwrap()
            .unwrap();
        assert_eq!(t.session.status, GameStatus::AnsweringTurn);
        assert_eq!(next.tag.phase, TimedPhase::Answering { turn: 1 });
        assert!(
            t.session
                .skip_votes
                .as_ref()
                .unwrap()
                .values()
                .all(|vote| !vote.voted && vote.skip_voters.is_empty())
        );

        // The submission timer fires later and must not touch anything.
        assert_eq!(t.fire(submission), TimerFired::Stale);
        assert_eq!(t.turn().number, 1);
    }

    #[test]
    fn stale_answering_timers_are_ignored() {
        let mut t = table(&[1, 1]);
        let submission = t.start();
        let first_turn = match t.fire(submission) {
            TimerFired::Advanced(Some(timer)) => timer,
            other => panic!("unexpected {other:?}"),
        };

        let (a, b) = (t.members[0][0], t.members[1][0]);
        t.session.vote_skip(a, &mut t.rng, SystemTime::now()).unwrap();
        t.session.vote_skip(b, &mut t.rng, SystemTime::now()).unwrap();
        assert_eq!(t.turn().number, 2);

        assert_eq!(t.fire(first_turn), TimerFired::Stale);
        assert_eq!(t.turn().number, 2);
        assert_eq!(t.session.status, GameStatus::AnsweringTurn);
    }

    #[test]
    fn skip_votes_are_rejected_outside_timed_phases() {
        let mut t = table(&[1, 1]);
        let admin = t.admin();
        assert_eq!(
            t.session.vote_skip(admin, &mut t.rng, SystemTime::now()),
            Err(ServiceError::Rejected(Rejection::WrongPhase))
        );
    }

    fn play_to_finish(t: &mut Table) {
        let mut timer = Some(t.start());
        while let Some(current) = timer {
            timer = match t.fire(current) {
                TimerFired::Advanced(next) => next,
                TimerFired::Stale => panic!("live timer reported stale"),
            };
        }
        assert_eq!(t.session.status, GameStatus::Finished);
    }

    #[test]
    fn replay_resets_game_data_but_keeps_membership() {
        let config = GameConfig {
            questions_per_team: 1,
            questions_per_turn: 1,
            ..GameConfig::default()
        };
        let mut t = table_with(&[2, 1], config);
        play_to_finish(&mut t);
        let membership: Vec<Vec<PlayerId>> = t
            .session
            .teams
            .values()
            .map(|team| team.player_ids.clone())
            .collect();
        assert!(t.session.teams.values().all(|team| team.score == -3));

        let teammate = t.members[0][1];
        assert_eq!(
            t.session.replay(teammate).unwrap_err(),
            ServiceError::Rejected(Rejection::NotAdmin)
        );

        let admin = t.admin();
        t.session.replay(admin).unwrap();

        assert_eq!(t.session.status, GameStatus::Lobby);
        assert!(t.session.teams.values().all(|team| team.score == 0));
        assert!(t.session.questions.is_empty());
        assert!(t.session.question_proposals.is_empty());
        assert!(t.session.answers.is_empty());
        assert!(t.session.answer_proposals.is_empty());
        assert!(t.session.current_turn.is_none());
        assert!(t.session.results.is_none());
        assert!(t.session.skip_votes.is_none());
        assert_eq!(t.session.players.len(), 3);
        let after: Vec<Vec<PlayerId>> = t
            .session
            .teams
            .values()
            .map(|team| team.player_ids.clone())
            .collect();
        assert_eq!(after, membership);

        assert_eq!(
            t.session.replay(admin).unwrap_err(),
            ServiceError::Rejected(Rejection::WrongPhase)
        );
    }

    #[test]
    fn timers_from_a_previous_game_are_stale() {
        let config = GameConfig {
            questions_per_team: 1,
            questions_per_turn: 1,
            ..GameConfig::default()
        };
        let mut t = table_with(&[1, 1], config);
        let old_submission = TimerTag {
            game_number: 1,
            phase: TimedPhase::QuestionSubmission,
        };
        play_to_finish(&mut t);
        let admin = t.admin();
        t.session.replay(admin).unwrap();
        let fresh = t.start();
        assert_eq!(fresh.tag.game_number, 2);

        assert_eq!(
            t.session
                .fire_timer(old_submission, &mut t.rng, SystemTime::now()),
            TimerFired::Stale
        );
        assert_eq!(t.session.status, GameStatus::SubmittingQuestions);
    }

    #[test]
    fn config_changes_apply_to_the_next_game() {
        let mut t = table(&[1, 1]);
        let admin = t.admin();
        t.session
            .update_config(
                admin,
                GameConfigPatch {
                    questions_per_team: Some(3),
                    questions_per_turn: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        let submission = t.start();
        t.fire(submission);

        assert_eq!(t.session.questions[&t.teams[0]].len(), 3);
        assert_eq!(t.turn().questions_in_play.len(), 4);

        let timer = TimerTag {
            game_number: 1,
            phase: TimedPhase::Answering { turn: 1 },
        };
        t.session.fire_timer(timer, &mut t.rng, SystemTime::now());
        // The last turn carries the remaining single question of each team.
        assert_eq!(t.turn().number, 2);
        assert_eq!(t.turn().questions_in_play.len(), 2);
    }
}
