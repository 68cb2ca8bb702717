//! Quiz Data Model
//!
//! Plain data shared by the generator, the session state machine and the
//! round controller. Everything here is serializable so the shells can push
//! it to clients unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest number of questions a quiz may request.
pub const MIN_QUESTION_COUNT: usize = 3;
/// Largest number of questions a quiz may request.
pub const MAX_QUESTION_COUNT: usize = 20;
/// Number of options every generated question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

const DEFAULT_TOPIC: &str = "General Knowledge";
const MIN_CONTENT_CHARS: usize = 10;

/// Requested difficulty, forwarded verbatim into the generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Expert => write!(f, "Expert"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(ValidationError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Input rejected before a session is started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a topic or some reference content is required")]
    MissingTopicAndContent,
    #[error("question count must be between {min} and {max}, got {0}", min = MIN_QUESTION_COUNT, max = MAX_QUESTION_COUNT)]
    QuestionCountOutOfRange(usize),
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
}

/// The immutable settings of one quiz session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub topic: String,
    /// Reference material the questions should be drawn from. May be empty.
    pub content: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
}

/// Raw setup input as a user typed it.
///
/// Shells build one of these and call [`QuizDraft::into_config`]; the
/// session itself trusts the resulting [`QuizConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
}

fn default_question_count() -> usize {
    5
}

impl Default for QuizDraft {
    fn default() -> Self {
        Self {
            topic: String::new(),
            content: String::new(),
            difficulty: Difficulty::default(),
            question_count: default_question_count(),
        }
    }
}

impl QuizDraft {
    /// Validates the draft and fills in the fallbacks for a missing topic or
    /// a too-short context.
    pub fn into_config(self) -> Result<QuizConfig, ValidationError> {
        let topic = self.topic.trim();
        let content = self.content.trim();
        if topic.is_empty() && content.is_empty() {
            return Err(ValidationError::MissingTopicAndContent);
        }
        if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&self.question_count) {
            return Err(ValidationError::QuestionCountOutOfRange(
                self.question_count,
            ));
        }

        let topic = if topic.is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            topic.to_string()
        };
        let content = if content.chars().count() > MIN_CONTENT_CHARS {
            content.to_string()
        } else {
            format!("Topic to generate quiz about: {}", topic)
        };

        Ok(QuizConfig {
            topic,
            content,
            difficulty: self.difficulty,
            question_count: self.question_count,
        })
    }
}

/// One answer option together with the explanation of why it is right or wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub text: String,
    pub rationale: String,
    pub is_correct: bool,
}

/// A multiple-choice question in canonical order (correct option first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<QuizOption>,
}

impl Question {
    /// Index of the correct option in canonical order, if any.
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.is_correct)
    }
}

/// Record of one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_index: usize,
    /// Index into the question's canonical option order.
    pub selected_option_index: usize,
    pub is_correct: bool,
}

/// Position within the quiz, 1-based for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percent: f64,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64 * 100.0).min(100.0)
        };
        Self {
            current,
            total,
            percent,
        }
    }
}

/// How well a finished quiz went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// More than 80% correct.
    Mastery,
    /// More than 50% correct.
    Solid,
    Review,
}

/// Final result shown once the session is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizSummary {
    pub score: usize,
    pub total: usize,
    pub accuracy_percent: u32,
    pub tier: PerformanceTier,
}

impl QuizSummary {
    pub fn new(score: usize, total: usize) -> Self {
        let ratio = if total == 0 {
            0.0
        } else {
            score as f64 / total as f64
        };
        let tier = if ratio > 0.8 {
            PerformanceTier::Mastery
        } else if ratio > 0.5 {
            PerformanceTier::Solid
        } else {
            PerformanceTier::Review
        };
        Self {
            score,
            total,
            accuracy_percent: (ratio * 100.0).round() as u32,
            tier,
        }
    }
}
