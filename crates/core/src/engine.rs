//! Quiz Engine
//!
//! Wires the session state machine, the round controller and the generator
//! into one single-owner control flow. Shells call [`QuizEngine::start`],
//! [`QuizEngine::select`] and [`QuizEngine::reset`], and feed every
//! [`EngineEvent`] they receive from [`EngineEvents`] back through
//! [`QuizEngine::apply`]:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = input.next() => handle(&mut engine, cmd),
//!         Some(event) = events.recv() => { engine.apply(event); }
//!     }
//!     render(engine.snapshot());
//! }
//! ```

use crate::{
    Command,
    generator::{GenerationError, QuizGenerator},
    model::{Question, QuizConfig},
    round::{RoundController, RoundError, RoundOutcome, RoundView},
    schedule::ScheduledTask,
    session::{QuizSession, SessionError, SessionSnapshot, SessionToken},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long a revealed answer stays on screen before the quiz advances.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub reveal_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reveal_delay: DEFAULT_REVEAL_DELAY,
        }
    }
}

/// Completion of a background task, to be passed to [`QuizEngine::apply`].
#[derive(Debug)]
pub enum EngineEvent {
    Generated {
        token: SessionToken,
        result: Result<Vec<Question>, GenerationError>,
    },
    RevealElapsed {
        outcome: RoundOutcome,
    },
}

/// Receiving half of the engine's event channel.
#[derive(Debug)]
pub struct EngineEvents {
    rx: mpsc::Receiver<EngineEvent>,
}

impl EngineEvents {
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error("no question is being played")]
    NoActiveRound,
}

/// Everything a shell needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSnapshot {
    pub session: SessionSnapshot,
    pub round: Option<RoundView>,
}

pub struct QuizEngine {
    generator: Arc<dyn QuizGenerator>,
    settings: EngineSettings,
    session: QuizSession,
    round: Option<RoundController>,
    rng: StdRng,
    tx: mpsc::Sender<EngineEvent>,
    generation: Option<ScheduledTask>,
    reveal: Option<ScheduledTask>,
}

impl QuizEngine {
    /// Creates an engine in the `Setup` phase.
    pub fn new(
        generator: Arc<dyn QuizGenerator>,
        settings: EngineSettings,
    ) -> (Self, EngineEvents) {
        let (tx, rx) = mpsc::channel(8);
        let engine = Self {
            generator,
            settings,
            session: QuizSession::new(),
            round: None,
            rng: StdRng::from_os_rng(),
            tx,
            generation: None,
            reveal: None,
        };
        (engine, EngineEvents { rx })
    }

    /// Replaces the shuffle source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn round(&self) -> Option<&RoundController> {
        self.round.as_ref()
    }

    /// Starts generating a quiz in the background.
    ///
    /// The session is `Loading` until the matching [`EngineEvent::Generated`]
    /// is applied.
    pub fn start(&mut self, config: QuizConfig) -> Result<SessionToken, EngineError> {
        let token = self.session.begin_start(config.clone())?;
        self.cancel_pending();
        self.round = None;

        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        self.generation = Some(ScheduledTask::spawn(async move {
            let result = generator.generate(&config).await;
            if tx
                .send(EngineEvent::Generated { token, result })
                .await
                .is_err()
            {
                debug!(%token, "Generation finished after the engine was dropped.");
            }
        }));
        Ok(token)
    }

    /// Selects an option of the current round by its shuffled position.
    ///
    /// The first selection reveals the round and schedules the outcome to be
    /// reported after the reveal delay. Further selections return `Ok(None)`.
    pub fn select(&mut self, index: usize) -> Result<Option<RoundOutcome>, EngineError> {
        let round = self.round.as_mut().ok_or(EngineError::NoActiveRound)?;
        let Some(outcome) = round.select(index)? else {
            debug!(index, "Ignoring selection on a revealed round");
            return Ok(None);
        };

        info!(
            question = outcome.round.question_index,
            correct = outcome.is_correct,
            "Option selected"
        );
        self.reveal = Some(ScheduledTask::after(
            self.settings.reveal_delay,
            self.tx.clone(),
            EngineEvent::RevealElapsed { outcome },
        ));
        Ok(Some(outcome))
    }

    /// Abandons the current quiz and any pending work, returning to `Setup`.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.round = None;
        self.session.reset();
    }

    /// Runs a shell command against the engine.
    pub fn execute(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Start(config) => self.start(config).map(|_| ()),
            Command::Select(index) => self.select(index).map(|_| ()),
            Command::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Applies a background completion. Returns `true` if state changed.
    pub fn apply(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Generated { token, result } => {
                if !self.session.finish_start(token, result) {
                    return false;
                }
                self.generation = None;
                self.sync_round();
                true
            }
            EngineEvent::RevealElapsed { outcome } => {
                let current = self.round.as_ref().map(RoundController::id);
                if current != Some(outcome.round) || self.session.round_id() != Some(outcome.round)
                {
                    debug!(round = ?outcome.round, "Dropping stale reveal");
                    return false;
                }
                self.reveal = None;
                match self
                    .session
                    .submit_answer(outcome.option_index, outcome.is_correct)
                {
                    Ok(_) => {
                        self.sync_round();
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not record answer");
                        false
                    }
                }
            }
        }
    }

    /// Aborts the generation request and reveal timer, if any.
    fn cancel_pending(&mut self) {
        if let Some(task) = self.generation.take() {
            debug!("Cancelling pending generation");
            task.cancel();
        }
        if let Some(task) = self.reveal.take() {
            debug!("Cancelling pending reveal");
            task.cancel();
        }
    }

    /// Rebuilds the round whenever the session's current question changed.
    fn sync_round(&mut self) {
        let id = self.session.round_id();
        if self.round.as_ref().map(RoundController::id) == id {
            return;
        }
        self.round = match (id, self.session.current_question()) {
            (Some(id), Some(question)) => Some(RoundController::new(id, question, &mut self.rng)),
            _ => None,
        };
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            session: self.session.snapshot(),
            round: self.round.as_ref().map(RoundController::view),
        }
    }
}
