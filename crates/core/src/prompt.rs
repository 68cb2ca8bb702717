//! Prompt rendering for quiz generation.
//!
//! Templates are Markdown files loaded at startup (see `PROMPTS_PATH`); this
//! module only fills in their `{placeholders}`.

use crate::model::QuizConfig;
use std::{collections::HashMap, fs, io, path::Path};

/// Key of the system instruction template.
pub const SYSTEM_PROMPT_KEY: &str = "quiz_system";
/// Key of the user instruction template.
pub const USER_PROMPT_KEY: &str = "quiz_user";

/// Upper bound on how much reference content is forwarded to the provider.
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Loads every `*.md` file in `dir`, keyed by file stem.
pub fn load_templates(dir: &Path) -> io::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }
        if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
            prompts.insert(key.to_string(), fs::read_to_string(&path)?);
        }
    }
    Ok(prompts)
}

/// Returns at most the first `max_chars` characters of `content`.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &content[..byte_idx],
        None => content,
    }
}

/// Replaces every `{name}` token found in `values` in a single pass.
///
/// Substituted text is never rescanned, and unknown tokens are left as-is.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let matched = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match matched {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fills the system instruction template.
///
/// Supported placeholders: `{difficulty}`, `{language}`.
pub fn render_system(template: &str, config: &QuizConfig, language: &str) -> String {
    let difficulty = config.difficulty.to_string();
    fill(
        template,
        &[("difficulty", difficulty.as_str()), ("language", language)],
    )
}

/// Fills the user instruction template.
///
/// Supported placeholders: `{topic}`, `{question_count}`, `{content}`. The
/// content is cut to [`MAX_CONTENT_CHARS`]. Braces inside the topic or the
/// content are copied verbatim.
pub fn render_user(template: &str, config: &QuizConfig) -> String {
    let question_count = config.question_count.to_string();
    fill(
        template,
        &[
            ("topic", config.topic.as_str()),
            ("question_count", question_count.as_str()),
            (
                "content",
                truncate_chars(&config.content, MAX_CONTENT_CHARS),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    fn config(content: String) -> QuizConfig {
        QuizConfig {
            topic: "Photosynthesis".to_string(),
            content,
            difficulty: Difficulty::Expert,
            question_count: 7,
        }
    }

    #[test]
    fn test_load_templates_reads_markdown_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quiz_system.md"), "system {language}").unwrap();
        fs::write(dir.path().join("quiz_user.md"), "user {topic}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = load_templates(dir.path()).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[SYSTEM_PROMPT_KEY], "system {language}");
        assert_eq!(prompts[USER_PROMPT_KEY], "user {topic}");
    }

    #[test]
    fn test_load_templates_missing_dir_is_an_error() {
        assert!(load_templates(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_shipped_prompts_cover_every_placeholder() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts");
        let prompts = load_templates(&dir).unwrap();
        let system = &prompts[SYSTEM_PROMPT_KEY];
        assert!(system.contains("{language}") && system.contains("{difficulty}"));
        let user = &prompts[USER_PROMPT_KEY];
        for placeholder in ["{topic}", "{content}", "{question_count}"] {
            assert!(user.contains(placeholder), "missing {}", placeholder);
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_render_user_truncates_content() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 500);
        let rendered = render_user("[{content}]", &config(long));
        assert_eq!(rendered.len(), MAX_CONTENT_CHARS + 2);
    }

    #[test]
    fn test_render_user_fills_placeholders() {
        let rendered = render_user(
            "TOPIC: {topic}\nGenerate {question_count} questions.\n{content}",
            &config("Chlorophyll absorbs {light}.".to_string()),
        );
        assert_eq!(
            rendered,
            "TOPIC: Photosynthesis\nGenerate 7 questions.\nChlorophyll absorbs {light}."
        );
    }

    #[test]
    fn test_render_user_does_not_expand_placeholders_inside_content() {
        let rendered = render_user("{content}", &config("see {topic}".to_string()));
        assert_eq!(rendered, "see {topic}");
    }

    #[test]
    fn test_render_user_does_not_expand_placeholders_inside_topic() {
        let mut cfg = config("Tidal forces and the Moon".to_string());
        cfg.topic = "Count {question_count} and {content}".to_string();
        let rendered = render_user("TOPIC: {topic}\n{content}", &cfg);
        assert_eq!(
            rendered,
            "TOPIC: Count {question_count} and {content}\nTidal forces and the Moon"
        );
    }

    #[test]
    fn test_render_keeps_unknown_and_unclosed_braces() {
        let rendered = render_user(r#"{"question": string} {topic} {oops"#, &config(String::new()));
        assert_eq!(rendered, r#"{"question": string} Photosynthesis {oops"#);
    }

    #[test]
    fn test_render_system_fills_difficulty_and_language() {
        let rendered = render_system(
            "Language: {language}. Difficulty: {difficulty}.",
            &config(String::new()),
            "English",
        );
        assert_eq!(rendered, "Language: English. Difficulty: Expert.");
    }
}
