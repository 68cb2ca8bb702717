//! Quiz Session State Machine
//!
//! Owns the five-phase lifecycle of a quiz and the score/answer bookkeeping.
//! The machine is synchronous: generating questions happens elsewhere and is
//! reported back through [`QuizSession::finish_start`] together with the
//! [`SessionToken`] handed out when the request began. A token that no
//! longer matches (because the user reset or restarted) is ignored.

use crate::{
    generator::GenerationError,
    model::{Progress, Question, QuizConfig, QuizSummary, UserAnswer},
    round::RoundId,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Setup,
    Loading,
    Playing,
    Finished,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Loading => "loading",
            Phase::Playing => "playing",
            Phase::Finished => "finished",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Epoch of a session. Bumped by every start and reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SessionToken(u64);

impl SessionToken {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A command that is not valid in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a quiz is already being generated")]
    AlreadyLoading,
    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },
}

/// Result of [`QuizSession::submit_answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecorded {
    pub answer: UserAnswer,
    /// `true` when this was the last question.
    pub finished: bool,
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub config: Option<QuizConfig>,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub score: usize,
    pub answers: Vec<UserAnswer>,
    pub error_message: Option<String>,
    pub progress: Option<Progress>,
    pub summary: Option<QuizSummary>,
}

/// The session aggregate.
#[derive(Debug, Default)]
pub struct QuizSession {
    phase: Phase,
    token: SessionToken,
    config: Option<QuizConfig>,
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    answers: Vec<UserAnswer>,
    error_message: Option<String>,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The question being played, if any.
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase == Phase::Playing {
            self.questions.get(self.current_index)
        } else {
            None
        }
    }

    /// Identity of the round currently being played.
    pub fn round_id(&self) -> Option<RoundId> {
        self.current_question().map(|_| RoundId {
            session: self.token,
            question_index: self.current_index,
        })
    }

    pub fn progress(&self) -> Option<Progress> {
        match self.phase {
            Phase::Playing | Phase::Finished => Some(Progress::new(
                (self.current_index + 1).min(self.questions.len()),
                self.questions.len(),
            )),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<QuizSummary> {
        (self.phase == Phase::Finished).then(|| QuizSummary::new(self.score, self.questions.len()))
    }

    /// Enters `Loading` for a new quiz and returns the token the generation
    /// result must be reported with.
    ///
    /// Valid from `Setup` and `Error` only. A second start while loading is
    /// rejected so that at most one request is in flight per session.
    pub fn begin_start(&mut self, config: QuizConfig) -> Result<SessionToken, SessionError> {
        match self.phase {
            Phase::Setup | Phase::Error => {}
            Phase::Loading => return Err(SessionError::AlreadyLoading),
            phase => {
                return Err(SessionError::InvalidTransition {
                    action: "start a quiz",
                    phase,
                });
            }
        }

        self.token = self.token.next();
        self.phase = Phase::Loading;
        self.error_message = None;
        info!(
            token = %self.token,
            topic = %config.topic,
            difficulty = %config.difficulty,
            count = config.question_count,
            "Quiz generation started"
        );
        self.config = Some(config);
        Ok(self.token)
    }

    /// Applies the outcome of a generation request.
    ///
    /// Returns `false` (and changes nothing) if `token` is stale or the
    /// session is no longer loading.
    pub fn finish_start(
        &mut self,
        token: SessionToken,
        result: Result<Vec<Question>, GenerationError>,
    ) -> bool {
        if token != self.token || self.phase != Phase::Loading {
            debug!(%token, current = %self.token, phase = %self.phase, "Dropping stale generation result");
            return false;
        }

        match result {
            Ok(questions) if !questions.is_empty() => {
                info!(%token, questions = questions.len(), "Quiz ready");
                self.questions = questions;
                self.current_index = 0;
                self.score = 0;
                self.answers.clear();
                self.phase = Phase::Playing;
            }
            Ok(_) => self.fail(GenerationError::NoQuestions.to_string()),
            Err(e) => self.fail(e.to_string()),
        }
        true
    }

    fn fail(&mut self, message: String) {
        warn!(token = %self.token, error = %message, "Quiz generation failed");
        self.questions.clear();
        self.error_message = Some(message);
        self.phase = Phase::Error;
    }

    /// Records the outcome of the current round and advances.
    pub fn submit_answer(
        &mut self,
        selected_option_index: usize,
        selected_is_correct: bool,
    ) -> Result<AnswerRecorded, SessionError> {
        if self.phase != Phase::Playing {
            return Err(SessionError::InvalidTransition {
                action: "submit an answer",
                phase: self.phase,
            });
        }

        let answer = UserAnswer {
            question_index: self.current_index,
            selected_option_index,
            is_correct: selected_is_correct,
        };
        self.answers.push(answer);
        if selected_is_correct {
            self.score += 1;
        }

        let finished = self.current_index + 1 >= self.questions.len();
        if finished {
            self.phase = Phase::Finished;
            info!(score = self.score, total = self.questions.len(), "Quiz finished");
        } else {
            self.current_index += 1;
        }
        debug!(?answer, score = self.score, "Answer recorded");
        Ok(AnswerRecorded { answer, finished })
    }

    /// Returns to `Setup` from any phase, discarding the quiz.
    ///
    /// Any generation still in flight is orphaned: its token no longer
    /// matches.
    pub fn reset(&mut self) {
        if self.phase != Phase::Setup {
            info!(from = %self.phase, "Session reset");
        }
        *self = Self {
            token: self.token.next(),
            ..Self::default()
        };
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            config: self.config.clone(),
            questions: self.questions.clone(),
            current_index: self.current_index,
            score: self.score,
            answers: self.answers.clone(),
            error_message: self.error_message.clone(),
            progress: self.progress(),
            summary: self.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuizOption};

    fn config(count: usize) -> QuizConfig {
        QuizConfig {
            topic: "Cells".to_string(),
            content: String::new(),
            difficulty: Difficulty::Easy,
            question_count: count,
        }
    }

    fn question(n: usize) -> Question {
        Question {
            text: format!("Q{}", n),
            options: (0..4)
                .map(|i| QuizOption {
                    text: format!("opt{}", i),
                    rationale: String::new(),
                    is_correct: i == 0,
                })
                .collect(),
        }
    }

    fn playing(count: usize) -> QuizSession {
        let mut session = QuizSession::new();
        let token = session.begin_start(config(count)).unwrap();
        assert!(session.finish_start(token, Ok((0..count).map(question).collect())));
        session
    }

    fn assert_invariants(s: &QuizSession) {
        assert!(s.score() <= s.answers().len());
        assert!(s.answers().len() <= s.questions().len());
        assert_eq!(s.score(), s.answers().iter().filter(|a| a.is_correct).count());
        match s.phase() {
            Phase::Playing => {
                assert!(s.current_index() < s.questions().len());
                assert_eq!(s.answers().len(), s.current_index());
            }
            Phase::Finished => assert_eq!(s.answers().len(), s.questions().len()),
            _ => {}
        }
    }

    #[test]
    fn test_new_session_is_in_setup() {
        let s = QuizSession::new();
        assert_eq!(s.phase(), Phase::Setup);
        assert!(s.round_id().is_none());
        assert!(s.progress().is_none());
    }

    #[test]
    fn test_successful_start_enters_playing() {
        let s = playing(3);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.score(), 0);
        assert!(s.answers().is_empty());
        assert_eq!(s.current_question().unwrap().text, "Q0");
        assert_eq!(s.progress().unwrap().current, 1);
    }

    #[test]
    fn test_second_start_while_loading_is_rejected() {
        let mut s = QuizSession::new();
        s.begin_start(config(3)).unwrap();
        assert_eq!(s.begin_start(config(3)), Err(SessionError::AlreadyLoading));
        assert_eq!(s.phase(), Phase::Loading);
    }

    #[test]
    fn test_start_while_playing_is_invalid() {
        let mut s = playing(3);
        let err = s.begin_start(config(3)).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                action: "start a quiz",
                phase: Phase::Playing
            }
        );
        assert_eq!(err.to_string(), "cannot start a quiz while the session is playing");
    }

    #[test]
    fn test_empty_question_set_is_an_error() {
        let mut s = QuizSession::new();
        let token = s.begin_start(config(3)).unwrap();
        assert!(s.finish_start(token, Ok(vec![])));
        assert_eq!(s.phase(), Phase::Error);
        assert_eq!(s.error_message(), Some("no questions generated"));
    }

    #[test]
    fn test_generation_failure_then_retry() {
        let mut s = QuizSession::new();
        let token = s.begin_start(config(3)).unwrap();
        s.finish_start(token, Err(GenerationError::EmptyResponse));
        assert_eq!(s.phase(), Phase::Error);
        assert!(!s.error_message().unwrap().is_empty());

        let retry = s.begin_start(config(3)).unwrap();
        assert_ne!(retry, token);
        assert_eq!(s.phase(), Phase::Loading);
        assert!(s.error_message().is_none());
        assert!(s.finish_start(retry, Ok(vec![question(0)])));
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn test_stale_generation_result_is_dropped() {
        let mut s = QuizSession::new();
        let stale = s.begin_start(config(3)).unwrap();
        s.reset();
        let fresh = s.begin_start(config(4)).unwrap();

        assert!(!s.finish_start(stale, Ok(vec![question(0)])));
        assert_eq!(s.phase(), Phase::Loading);

        assert!(s.finish_start(fresh, Ok(vec![question(0), question(1)])));
        assert_eq!(s.questions().len(), 2);
    }

    #[test]
    fn test_result_after_reset_does_not_leave_setup() {
        let mut s = QuizSession::new();
        let token = s.begin_start(config(3)).unwrap();
        s.reset();
        assert!(!s.finish_start(token, Ok(vec![question(0)])));
        assert_eq!(s.phase(), Phase::Setup);
        assert!(s.questions().is_empty());
    }

    #[test]
    fn test_submit_answers_until_finished() {
        let mut s = playing(3);

        let first = s.submit_answer(0, true).unwrap();
        assert!(!first.finished);
        assert_eq!(first.answer.question_index, 0);
        assert_invariants(&s);

        s.submit_answer(2, false).unwrap();
        assert_invariants(&s);
        assert_eq!(s.current_index(), 2);

        let last = s.submit_answer(0, true).unwrap();
        assert!(last.finished);
        assert_eq!(s.phase(), Phase::Finished);
        assert_eq!(s.score(), 2);
        assert_eq!(s.answers().len(), 3);
        assert_eq!(s.current_index(), 2);
        assert_invariants(&s);

        let summary = s.summary().unwrap();
        assert_eq!(summary.accuracy_percent, 67);
        assert_eq!(s.progress().unwrap().current, 3);
    }

    #[test]
    fn test_submit_outside_playing_is_rejected() {
        let mut s = QuizSession::new();
        assert!(s.submit_answer(0, true).is_err());

        let mut finished = playing(1);
        finished.submit_answer(0, true).unwrap();
        assert!(matches!(
            finished.submit_answer(0, true),
            Err(SessionError::InvalidTransition { phase: Phase::Finished, .. })
        ));
        assert_eq!(finished.answers().len(), 1);
    }

    #[test]
    fn test_invariants_hold_over_mixed_answers() {
        let mut s = playing(5);
        for i in 0..5 {
            s.submit_answer(i % 4, i % 2 == 0).unwrap();
            assert_invariants(&s);
        }
        assert_eq!(s.score(), 3);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut s = playing(3);
        s.submit_answer(0, true).unwrap();

        s.reset();
        let once = s.snapshot();
        s.reset();
        let twice = s.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice.phase, Phase::Setup);
        assert_eq!(twice.score, 0);
        assert!(twice.questions.is_empty());
        assert!(twice.answers.is_empty());
        assert!(twice.config.is_none());
    }

    #[test]
    fn test_reset_bumps_token() {
        let mut s = playing(3);
        let before = s.token();
        s.reset();
        assert_ne!(s.token(), before);
    }

    #[test]
    fn test_round_id_tracks_question_index() {
        let mut s = playing(2);
        let first = s.round_id().unwrap();
        s.submit_answer(0, true).unwrap();
        let second = s.round_id().unwrap();
        assert_eq!(first.session, second.session);
        assert_eq!(second.question_index, 1);
        s.submit_answer(0, true).unwrap();
        assert!(s.round_id().is_none());
    }

    #[test]
    fn test_snapshot_serializes_phase_in_snake_case() {
        let json = serde_json::to_value(playing(3).snapshot()).unwrap();
        assert_eq!(json["phase"], "playing");
        assert_eq!(json["progress"]["total"], 3);
        assert!(json["summary"].is_null());
    }
}
