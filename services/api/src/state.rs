//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! clonable resources every connection needs.

use crate::config::Config;
use quiz_core::generator::QuizGenerator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn QuizGenerator>,
    pub config: Arc<Config>,
}
