//! Maps lines typed at the prompt to engine commands.

use quiz_core::{Command, model::QuizConfig, session::Phase};

/// What a line of user input asks for.
#[derive(Debug)]
pub enum Input {
    Quit,
    Command(Command),
    /// Clear a finished quiz and generate a new one with the same settings.
    Restart,
    /// Nothing to do in the current phase.
    Ignored,
}

/// Interprets one input line for the given phase.
///
/// Answers are typed as the 1-based option number shown on screen.
pub fn parse(line: &str, phase: Phase, config: &QuizConfig) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" => Input::Quit,
        "r" | "reset" => Input::Command(Command::Reset),
        "" => match phase {
            Phase::Setup | Phase::Error => Input::Command(Command::Start(config.clone())),
            Phase::Finished => Input::Restart,
            Phase::Loading | Phase::Playing => Input::Ignored,
        },
        answer if phase == Phase::Playing => match answer.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(Command::Select(n - 1)),
            _ => Input::Ignored,
        },
        _ => Input::Ignored,
    }
}
