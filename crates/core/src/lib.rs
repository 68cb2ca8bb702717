pub mod engine;
pub mod generator;
pub mod model;
pub mod prompt;
pub mod round;
pub mod schedule;
pub mod session;

use model::QuizConfig;

/// Represents the commands a shell issues to the quiz engine.
///
/// These are the only entry points into a running session; everything else
/// the shell learns from [`engine::QuizSnapshot`]s.
#[derive(Debug, Clone)]
pub enum Command {
    /// Generate a new quiz and start playing it.
    Start(QuizConfig),
    /// Pick an option of the current question by its on-screen position.
    Select(usize),
    /// Abandon the current quiz and return to setup.
    Reset,
}
