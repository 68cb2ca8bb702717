//! Presentation Round Controller
//!
//! One [`RoundController`] exists per question being played. It fixes a random
//! option order when it is created, accepts exactly one selection, and
//! describes how the revealed options should be shown.

use crate::{
    model::{Question, QuizOption},
    session::SessionToken,
};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

/// Identity of a round: which session epoch and which question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RoundId {
    pub session: SessionToken,
    pub question_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("option {index} does not exist (round has {len} options)")]
    OptionOutOfRange { index: usize, len: usize },
}

/// What a completed round reports back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: RoundId,
    /// Position the user clicked, in shuffled order.
    pub shuffled_index: usize,
    /// The same option in the question's canonical order.
    pub option_index: usize,
    pub is_correct: bool,
}

/// How an option is drawn once the round is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMarker {
    /// Not revealed yet.
    Neutral,
    Correct,
    /// The user's pick, and it was wrong.
    WrongPick,
    /// An incorrect option nobody picked.
    Dimmed,
}

/// One option as the shell should render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDisplay {
    pub text: String,
    pub marker: OptionMarker,
    /// Only set for the correct option and a wrong pick, after reveal.
    pub rationale: Option<String>,
}

/// Ephemeral per-question presentation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundView {
    pub round: RoundId,
    pub shuffled_options: Vec<QuizOption>,
    pub selected_index: Option<usize>,
    pub revealed: bool,
    pub display: Vec<OptionDisplay>,
}

#[derive(Debug, Clone)]
pub struct RoundController {
    id: RoundId,
    /// `order[i]` is the canonical index of the option shown at position `i`.
    order: Vec<usize>,
    options: Vec<QuizOption>,
    selected_index: Option<usize>,
    revealed: bool,
}

impl RoundController {
    /// Builds the round for `question`, shuffling its options once.
    pub fn new<R: Rng + ?Sized>(id: RoundId, question: &Question, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..question.options.len()).collect();
        order.shuffle(rng);
        let options = order.iter().map(|&i| question.options[i].clone()).collect();
        Self {
            id,
            order,
            options,
            selected_index: None,
            revealed: false,
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn shuffled_options(&self) -> &[QuizOption] {
        &self.options
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Records the user's pick and reveals the round.
    ///
    /// Only the first call has an effect; later calls return `Ok(None)`.
    pub fn select(&mut self, index: usize) -> Result<Option<RoundOutcome>, RoundError> {
        if self.revealed {
            return Ok(None);
        }
        let option = self
            .options
            .get(index)
            .ok_or(RoundError::OptionOutOfRange {
                index,
                len: self.options.len(),
            })?;

        self.selected_index = Some(index);
        self.revealed = true;
        Ok(Some(RoundOutcome {
            round: self.id,
            shuffled_index: index,
            option_index: self.order[index],
            is_correct: option.is_correct,
        }))
    }

    /// Applies the reveal policy to every shuffled option.
    pub fn display(&self) -> Vec<OptionDisplay> {
        self.options
            .iter()
            .enumerate()
            .map(|(idx, opt)| {
                let picked = self.selected_index == Some(idx);
                let marker = match (self.revealed, opt.is_correct, picked) {
                    (false, _, _) => OptionMarker::Neutral,
                    (true, true, _) => OptionMarker::Correct,
                    (true, false, true) => OptionMarker::WrongPick,
                    (true, false, false) => OptionMarker::Dimmed,
                };
                let rationale = matches!(marker, OptionMarker::Correct | OptionMarker::WrongPick)
                    .then(|| opt.rationale.clone());
                OptionDisplay {
                    text: opt.text.clone(),
                    marker,
                    rationale,
                }
            })
            .collect()
    }

    pub fn view(&self) -> RoundView {
        RoundView {
            round: self.id,
            shuffled_options: self.options.clone(),
            selected_index: self.selected_index,
            revealed: self.revealed,
            display: self.display(),
        }
    }
}
