//! Quiz Generation Gateway
//!
//! This module turns a [`QuizConfig`] into a validated question set. The
//! provider call sits behind the [`QuizGenerator`] trait so the session engine
//! can run against an LLM, a canned fixture, or a mock.
//!
//! The prompt contract places the correct answer first in every option list;
//! [`parse_question_set`] relies on that to tag correctness before any
//! shuffling happens.

use crate::{
    model::{OPTIONS_PER_QUESTION, Question, QuizConfig, QuizOption},
    prompt::{self, SYSTEM_PROMPT_KEY, USER_PROMPT_KEY},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// Base URL of the OpenAI chat completion API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
/// Base URL of Gemini's OpenAI-compatible endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Sampling temperature; kept low for factual accuracy.
const TEMPERATURE: f32 = 0.3;

/// Everything that can go wrong while producing a question set.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("quiz generation request failed: {0}")]
    Request(#[from] OpenAIError),
    #[error("empty response from AI")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no questions generated")]
    NoQuestions,
    #[error("missing prompt template: '{0}'")]
    MissingPrompt(String),
}

/// Produces the questions for a quiz session.
///
/// Implementations perform at most one outbound request per call and never
/// retry; the caller decides whether to start again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Generates up to `config.question_count` normalized questions.
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<Question>, GenerationError>;
}

/// Question shape the provider is asked to emit.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    text: String,
    rationale: String,
}

/// Accepted top-level shapes: the `{"questions": [...]}` object requested
/// through the response schema, or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawQuestionSet {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

impl RawQuestionSet {
    fn into_questions(self) -> Vec<RawQuestion> {
        match self {
            RawQuestionSet::Wrapped { questions } | RawQuestionSet::Bare(questions) => questions,
        }
    }
}

/// Name of the structured output format sent with every request.
const RESPONSE_SCHEMA_NAME: &str = "quiz_question_set";

/// JSON schema of [`RawQuestionSet::Wrapped`], in strict structured-output form.
fn question_set_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "options": {
                            "type": "array",
                            "minItems": OPTIONS_PER_QUESTION,
                            "maxItems": OPTIONS_PER_QUESTION,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "text": { "type": "string" },
                                    "rationale": { "type": "string" }
                                },
                                "required": ["text", "rationale"],
                                "additionalProperties": false
                            }
                        }
                    },
                    "required": ["question", "options"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

/// Strips a surrounding Markdown code fence (```json ... ```), if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validates a provider response and tags the correct options.
///
/// The response must hold `{question, options: [{text, rationale}]}` objects
/// with exactly four options each, either under a `questions` key or as a
/// bare array. Option 0 becomes the
/// correct one. Questions beyond `question_count` are dropped; fewer are kept
/// as a shorter quiz.
pub fn parse_question_set(
    raw: &str,
    question_count: usize,
) -> Result<Vec<Question>, GenerationError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let parsed = serde_json::from_str::<RawQuestionSet>(body)
        .map_err(|e| GenerationError::Malformed(e.to_string()))?
        .into_questions();
    if parsed.is_empty() {
        return Err(GenerationError::NoQuestions);
    }
    if parsed.len() > question_count {
        warn!(
            received = parsed.len(),
            requested = question_count,
            "Provider returned more questions than requested; truncating."
        );
    }

    parsed
        .into_iter()
        .take(question_count)
        .enumerate()
        .map(|(i, raw)| normalize(i, raw))
        .collect()
}

fn normalize(index: usize, raw: RawQuestion) -> Result<Question, GenerationError> {
    if raw.question.trim().is_empty() {
        return Err(GenerationError::Malformed(format!(
            "question {} has no text",
            index
        )));
    }
    if raw.options.len() != OPTIONS_PER_QUESTION {
        return Err(GenerationError::Malformed(format!(
            "question {} has {} options, expected {}",
            index,
            raw.options.len(),
            OPTIONS_PER_QUESTION
        )));
    }
    if raw.options.iter().any(|o| o.text.trim().is_empty()) {
        return Err(GenerationError::Malformed(format!(
            "question {} has an option without text",
            index
        )));
    }

    let options = raw
        .options
        .into_iter()
        .enumerate()
        .map(|(idx, opt)| QuizOption {
            text: opt.text,
            rationale: opt.rationale,
            is_correct: idx == 0,
        })
        .collect();

    Ok(Question {
        text: raw.question,
        options,
    })
}

/// A `QuizGenerator` backed by an OpenAI-compatible chat completion API.
///
/// Works against OpenAI directly and against Gemini's OpenAI-compatible
/// endpoint; the base URL lives in the supplied [`OpenAIConfig`].
pub struct LlmQuizGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: HashMap<String, String>,
    language: String,
}

impl LlmQuizGenerator {
    /// Creates a new LLM-backed generator.
    ///
    /// # Arguments
    ///
    /// * `config` - OpenAI API configuration (API key, base URL).
    /// * `model` - Model identifier (e.g., "gemini-2.5-flash").
    /// * `prompts` - Template map; must contain `"quiz_system"` and
    ///   `"quiz_user"`.
    /// * `language` - Output language the questions are written in.
    pub fn new(
        config: OpenAIConfig,
        model: String,
        prompts: HashMap<String, String>,
        language: String,
    ) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            prompts,
            language,
        }
    }

    fn template(&self, key: &str) -> Result<&str, GenerationError> {
        self.prompts
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| GenerationError::MissingPrompt(key.to_string()))
    }

    /// Builds the chat request, asking for output matching the question schema.
    fn build_request(
        &self,
        config: &QuizConfig,
    ) -> Result<CreateChatCompletionRequest, GenerationError> {
        let system = prompt::render_system(self.template(SYSTEM_PROMPT_KEY)?, config, &self.language);
        let user = prompt::render_user(self.template(USER_PROMPT_KEY)?, config);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(TEMPERATURE)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: RESPONSE_SCHEMA_NAME.to_string(),
                    description: Some("Multiple-choice questions, correct option first".to_string()),
                    schema: Some(question_set_schema()),
                    strict: Some(true),
                },
            })
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?
                    .into(),
            ])
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl QuizGenerator for LlmQuizGenerator {
    #[instrument(
        name = "generate_quiz",
        skip_all,
        fields(model = %self.model, topic = %config.topic, count = config.question_count)
    )]
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<Question>, GenerationError> {
        let request = self.build_request(config)?;

        info!("Requesting quiz from provider");
        let response = self.client.chat().create(request).await.inspect_err(|e| {
            error!(error = %e, "Quiz generation request failed");
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or(GenerationError::EmptyResponse)?;

        let questions = parse_question_set(content, config.question_count).inspect_err(|e| {
            warn!(error = %e, "Rejected provider response");
        })?;
        info!(received = questions.len(), "Quiz generated");
        Ok(questions)
    }
}

/// A deterministic `QuizGenerator` for local development and testing.
///
/// Produces exactly `question_count` well-formed questions without any
/// network access.
pub struct FixtureQuizGenerator;

#[async_trait]
impl QuizGenerator for FixtureQuizGenerator {
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<Question>, GenerationError> {
        let raw: Vec<RawQuestion> = (1..=config.question_count)
            .map(|n| RawQuestion {
                question: format!("{}: practice question {}?", config.topic, n),
                options: vec![
                    RawOption {
                        text: format!("The accurate statement #{}", n),
                        rationale: "This matches the reference material.".to_string(),
                    },
                    RawOption {
                        text: format!("A common misconception #{}", n),
                        rationale: "Plausible, but contradicts the material.".to_string(),
                    },
                    RawOption {
                        text: format!("An overgeneralisation #{}", n),
                        rationale: "Only true in a narrower case.".to_string(),
                    },
                    RawOption {
                        text: format!("An unrelated claim #{}", n),
                        rationale: "Not covered by the topic at all.".to_string(),
                    },
                ],
            })
            .collect();
        if raw.is_empty() {
            return Err(GenerationError::NoQuestions);
        }
        raw.into_iter()
            .enumerate()
            .map(|(i, q)| normalize(i, q))
            .collect()
    }
}
