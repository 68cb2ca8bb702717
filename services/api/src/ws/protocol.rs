//! Defines the WebSocket message protocol between the browser client and the API server.

use quiz_core::{engine::QuizSnapshot, model::QuizDraft};
use serde::{Deserialize, Serialize};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Generates a new quiz from the setup form and starts playing it.
    Start(QuizDraft),
    /// Picks an option of the current question by its on-screen position.
    Select { option_index: usize },
    /// Leaves the current quiz (or error screen) and returns to setup.
    Reset,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full quiz state, pushed after every transition.
    Snapshot { state: QuizSnapshot },
    /// A client command was rejected. The connection stays open.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::Difficulty;

    #[test]
    fn test_start_message_deserialization() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"start","topic":"Java history","difficulty":"Expert","question_count":4}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Start(draft) => {
                assert_eq!(draft.topic, "Java history");
                assert_eq!(draft.content, "");
                assert_eq!(draft.difficulty, Difficulty::Expert);
                assert_eq!(draft.question_count, 4);
            }
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_start_message_defaults() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"start","content":"Some notes"}"#).unwrap();
        let ClientMessage::Start(draft) = msg else {
            panic!("Expected Start");
        };
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.question_count, 5);
    }

    #[test]
    fn test_select_and_reset_deserialization() {
        let select: ClientMessage =
            serde_json::from_str(r#"{"type":"select","option_index":2}"#).unwrap();
        assert!(matches!(select, ClientMessage::Select { option_index: 2 }));

        let reset: ClientMessage = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert!(matches!(reset, ClientMessage::Reset));
    }

    #[test]
    fn test_unknown_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"cheat"}"#).is_err());
    }

    #[test]
    fn test_error_message_serialization() {
        let json = serde_json::to_value(ServerMessage::Error {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }
}
