//! Manages the WebSocket connection lifecycle for a quiz session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use quiz_core::{
    Command,
    engine::{EngineError, EngineSettings, QuizEngine},
    model::ValidationError,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A client message that could not be turned into an engine command.
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("invalid message: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Every connection gets its own quiz engine; nothing is shared between
/// connections except the generator.
#[instrument(name = "ws_session", skip_all, fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id: u32 = rand::random();
    tracing::Span::current().record("connection_id", &connection_id.to_string());
    info!("New WebSocket connection.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    if let Err(e) = run_quiz_session(&state, &mut socket_tx, &mut socket_rx).await {
        error!(error = ?e, "Quiz session terminated with error.");
    }
    info!("Quiz session finished.");
}

/// The main event loop for an active quiz connection.
///
/// Listens for client commands and engine completions, and pushes a fresh
/// snapshot to the client after every state change.
async fn run_quiz_session(
    state: &AppState,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    socket_rx: &mut SplitStream<WebSocket>,
) -> Result<()> {
    let settings = EngineSettings {
        reveal_delay: state.config.reveal_delay,
    };
    let (mut engine, mut events) = QuizEngine::new(Arc::clone(&state.generator), settings);
    send_snapshot(socket_tx, &engine).await?;

    loop {
        let changed = tokio::select! {
            // Handle messages from the client WebSocket.
            msg_result = socket_rx.next() => match msg_result {
                Some(Ok(Message::Text(text))) => match handle_client_text(&mut engine, &text) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Rejected client command.");
                        send_msg(socket_tx, ServerMessage::Error { message: e.to_string() }).await?;
                        false
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed the connection.");
                    break;
                }
                Some(Ok(_)) => false,
                Some(Err(e)) => {
                    error!("Error receiving from client WebSocket: {:?}", e);
                    break;
                }
            },
            // Handle generation results and elapsed reveal timers.
            Some(event) = events.recv() => engine.apply(event),
        };

        if changed {
            send_snapshot(socket_tx, &engine).await?;
        }
    }

    // Abort any request or timer still pending for this connection.
    engine.reset();
    Ok(())
}

/// Parses a client message and runs it against the engine.
fn handle_client_text(engine: &mut QuizEngine, text: &str) -> Result<(), CommandError> {
    let command = match serde_json::from_str::<ClientMessage>(text)? {
        ClientMessage::Start(draft) => Command::Start(draft.into_config()?),
        ClientMessage::Select { option_index } => Command::Select(option_index),
        ClientMessage::Reset => Command::Reset,
    };
    engine.execute(command)?;
    Ok(())
}

async fn send_snapshot(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    engine: &QuizEngine,
) -> Result<()> {
    send_msg(
        socket_tx,
        ServerMessage::Snapshot {
            state: engine.snapshot(),
        },
    )
    .await
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::{generator::FixtureQuizGenerator, session::Phase};

    fn engine() -> QuizEngine {
        QuizEngine::new(Arc::new(FixtureQuizGenerator), EngineSettings::default()).0
    }

    #[tokio::test]
    async fn test_start_command_enters_loading() {
        let mut engine = engine();
        handle_client_text(&mut engine, r#"{"type":"start","topic":"Rivers"}"#).unwrap();
        assert_eq!(engine.session().phase(), Phase::Loading);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_protocol_error() {
        let err = handle_client_text(&mut engine(), "{not json").unwrap_err();
        assert!(matches!(err, CommandError::Protocol(_)));
        assert!(err.to_string().starts_with("invalid message"));
    }

    #[tokio::test]
    async fn test_draft_validation_error_is_reported() {
        let err = handle_client_text(
            &mut engine(),
            r#"{"type":"start","topic":"Rivers","question_count":50}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation(ValidationError::QuestionCountOutOfRange(50))
        ));
    }

    #[tokio::test]
    async fn test_select_before_start_is_an_engine_error() {
        let err = handle_client_text(&mut engine(), r#"{"type":"select","option_index":0}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "no question is being played");
    }
}
