//! Quiz API Library Crate
//!
//! This library contains the WebSocket shell around `quiz-core`: environment
//! configuration, the shared application state, routing, and the per-connection
//! quiz session loop. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
