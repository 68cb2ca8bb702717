//! Text rendering of engine snapshots.

use quiz_core::{
    engine::QuizSnapshot,
    model::PerformanceTier,
    round::{OptionMarker, RoundView},
    session::Phase,
};
use std::fmt::Write;

/// Renders the whole screen for a snapshot.
pub fn render(snapshot: &QuizSnapshot) -> String {
    let session = &snapshot.session;
    let mut out = String::new();
    match session.phase {
        Phase::Setup => {
            out.push_str("Ready. Press Enter to generate a quiz, or q to quit.\n");
        }
        Phase::Loading => {
            let (topic, difficulty) = session
                .config
                .as_ref()
                .map(|c| (c.topic.as_str(), c.difficulty.to_string()))
                .unwrap_or(("your topic", String::new()));
            let _ = writeln!(out, "Constructing a {} quiz about {}...", difficulty, topic);
        }
        Phase::Playing => {
            if let Some(progress) = session.progress {
                let _ = writeln!(
                    out,
                    "Question {}/{} ({:.0}%)  Score: {}",
                    progress.current, progress.total, progress.percent, session.score
                );
            }
            if let Some(question) = session.questions.get(session.current_index) {
                let _ = writeln!(out, "\n{}\n", question.text);
            }
            if let Some(round) = &snapshot.round {
                render_round(&mut out, round);
            }
        }
        Phase::Finished => {
            if let Some(summary) = session.summary {
                let verdict = match summary.tier {
                    PerformanceTier::Mastery => "Excellent mastery!",
                    PerformanceTier::Solid => "Solid effort, a little review will help.",
                    PerformanceTier::Review => "Worth another pass through the material.",
                };
                let _ = writeln!(
                    out,
                    "Quiz complete! Score {}/{} ({}%). {}",
                    summary.score, summary.total, summary.accuracy_percent, verdict
                );
            }
            out.push_str("Press Enter for a new quiz, r to reset, or q to quit.\n");
        }
        Phase::Error => {
            let _ = writeln!(
                out,
                "Could not generate the quiz: {}",
                session.error_message.as_deref().unwrap_or("unknown error")
            );
            out.push_str("Press Enter to try again, or q to quit.\n");
        }
    }
    out
}

fn render_round(out: &mut String, round: &RoundView) {
    for (i, option) in round.display.iter().enumerate() {
        let marker = match option.marker {
            OptionMarker::Neutral | OptionMarker::Dimmed => ' ',
            OptionMarker::Correct => '+',
            OptionMarker::WrongPick => 'x',
        };
        let _ = writeln!(out, " {} {}. {}", marker, i + 1, option.text);
        if let Some(rationale) = &option.rationale {
            let _ = writeln!(out, "      {}", rationale);
        }
    }
    if !round.revealed {
        let _ = writeln!(
            out,
            "\nAnswer 1-{} (r to reset, q to quit):",
            round.display.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::{
        engine::{EngineSettings, QuizEngine},
        generator::{FixtureQuizGenerator, QuizGenerator},
        model::{Difficulty, QuizConfig},
    };
    use std::sync::Arc;

    fn config() -> QuizConfig {
        QuizConfig {
            topic: "Volcanoes".to_string(),
            content: String::new(),
            difficulty: Difficulty::Hard,
            question_count: 3,
        }
    }

    async fn playing_engine() -> QuizEngine {
        let generator: Arc<dyn QuizGenerator> = Arc::new(FixtureQuizGenerator);
        let (mut engine, mut events) = QuizEngine::new(generator, EngineSettings::default());
        engine.start(config()).unwrap();
        let event = events.recv().await.unwrap();
        assert!(engine.apply(event));
        engine
    }

    #[test]
    fn test_setup_screen_explains_keys() {
        let (engine, _events) =
            QuizEngine::new(Arc::new(FixtureQuizGenerator), EngineSettings::default());
        assert!(render(&engine.snapshot()).contains("Press Enter"));
    }

    #[tokio::test]
    async fn test_loading_screen_names_the_topic() {
        let (mut engine, _events) =
            QuizEngine::new(Arc::new(FixtureQuizGenerator), EngineSettings::default());
        engine.start(config()).unwrap();
        let screen = render(&engine.snapshot());
        assert!(screen.contains("Hard quiz about Volcanoes"), "{}", screen);
    }

    #[tokio::test]
    async fn test_playing_screen_lists_numbered_options() {
        let engine = playing_engine().await;
        let screen = render(&engine.snapshot());
        assert!(screen.starts_with("Question 1/3"), "{}", screen);
        for n in 1..=4 {
            assert!(screen.contains(&format!("   {}. ", n)), "{}", screen);
        }
        assert!(screen.contains("Answer 1-4"));
    }

    #[tokio::test]
    async fn test_revealed_round_marks_the_correct_option() {
        let mut engine = playing_engine().await;
        let wrong = engine
            .snapshot()
            .round
            .unwrap()
            .shuffled_options
            .iter()
            .position(|o| !o.is_correct)
            .unwrap();
        engine.select(wrong).unwrap();

        let screen = render(&engine.snapshot());
        assert!(screen.contains(&format!(" x {}. ", wrong + 1)), "{}", screen);
        assert!(screen.lines().any(|l| l.starts_with(" + ")), "{}", screen);
        assert!(!screen.contains("Answer 1-4"));
    }
}
