//! Terminal shell for playing a generated quiz.
//!
//! Drives the same engine as the WebSocket service: stdin lines become
//! commands, engine events are applied as they arrive, and the screen is
//! redrawn after every state change.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::{Parser, ValueEnum};
use quiz_core::{
    Command,
    engine::{EngineSettings, QuizEngine},
    generator::{
        FixtureQuizGenerator, GEMINI_API_BASE, LlmQuizGenerator, OPENAI_API_BASE, QuizGenerator,
    },
    model::{Difficulty, QuizConfig, QuizDraft},
    prompt,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod input;
mod render;

use input::Input;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    Gemini,
    Openai,
    Fixture,
}

/// Play an AI-generated multiple-choice quiz in the terminal
#[derive(Parser, Debug)]
#[command(name = "quiz-cli", version, about, long_about = None)]
struct Args {
    /// Subject of the quiz
    #[arg(long, default_value = "")]
    topic: String,

    /// Reference material to generate questions from
    #[arg(long)]
    content_file: Option<PathBuf>,

    /// Easy, Medium, Hard or Expert
    #[arg(long, default_value = "Medium")]
    difficulty: Difficulty,

    /// Number of questions (3-20)
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Use built-in practice questions instead of calling a provider
    #[arg(long)]
    offline: bool,

    #[arg(long, env = "QUIZ_PROVIDER", value_enum, default_value = "gemini")]
    provider: Provider,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Chat model name; defaults per provider
    #[arg(long, env = "CHAT_MODEL")]
    model: Option<String>,

    #[arg(long, env = "PROMPTS_PATH", default_value = "./prompts")]
    prompts_path: PathBuf,

    /// Language the questions are written in
    #[arg(long, env = "QUIZ_LANGUAGE", default_value = "Indonesian")]
    language: String,

    #[arg(long, env = "REVEAL_DELAY_MS", default_value_t = 1500)]
    reveal_delay_ms: u64,
}

impl Args {
    fn quiz_config(&self) -> anyhow::Result<QuizConfig> {
        let content = match &self.content_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?,
            None => String::new(),
        };
        let draft = QuizDraft {
            topic: self.topic.clone(),
            content,
            difficulty: self.difficulty,
            question_count: self.count,
        };
        Ok(draft.into_config()?)
    }

    fn build_generator(&self) -> anyhow::Result<Arc<dyn QuizGenerator>> {
        let provider = if self.offline {
            Provider::Fixture
        } else {
            self.provider
        };
        let (api_key, api_base, default_model) = match provider {
            Provider::Fixture => {
                info!("Using offline fixture provider.");
                return Ok(Arc::new(FixtureQuizGenerator));
            }
            Provider::Gemini => (&self.gemini_api_key, GEMINI_API_BASE, "gemini-2.5-flash"),
            Provider::Openai => (&self.openai_api_key, OPENAI_API_BASE, "gpt-4o"),
        };
        let api_key = api_key
            .as_ref()
            .context("API key missing for the selected provider (or pass --offline)")?;
        let prompts = prompt::load_templates(&self.prompts_path).with_context(|| {
            format!(
                "Could not load prompts from {}",
                self.prompts_path.display()
            )
        })?;
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());
        Ok(Arc::new(LlmQuizGenerator::new(
            openai_config,
            model,
            prompts,
            self.language.clone(),
        )))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the quiz screen.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = args.quiz_config()?;
    let generator = args.build_generator()?;
    let settings = EngineSettings {
        reveal_delay: Duration::from_millis(args.reveal_delay_ms),
    };
    let (mut engine, mut events) = QuizEngine::new(generator, settings);

    engine.start(config.clone())?;
    print!("{}", render::render(&engine.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let changed = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match input::parse(&line, engine.session().phase(), &config) {
                    Input::Quit => break,
                    Input::Ignored => false,
                    Input::Restart => {
                        engine.reset();
                        run(&mut engine, Command::Start(config.clone()))
                    }
                    Input::Command(command) => run(&mut engine, command),
                }
            }
            Some(event) = events.recv() => engine.apply(event),
        };

        if changed {
            println!();
            print!("{}", render::render(&engine.snapshot()));
        }
    }

    engine.reset();
    Ok(())
}

/// Executes a command, reporting rejections inline. Returns `true` on success.
fn run(engine: &mut QuizEngine, command: Command) -> bool {
    match engine.execute(command) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Rejected command.");
            println!("{}", e);
            false
        }
    }
}
