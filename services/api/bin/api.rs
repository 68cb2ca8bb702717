//! Main Entrypoint for the Quiz API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the quiz generator for the configured provider.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use quiz_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use quiz_core::{
    generator::{
        FixtureQuizGenerator, GEMINI_API_BASE, LlmQuizGenerator, OPENAI_API_BASE, QuizGenerator,
    },
    prompt,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Builds the generator for the configured provider.
fn build_generator(config: &Config) -> anyhow::Result<Arc<dyn QuizGenerator>> {
    let (api_key, api_base) = match &config.provider {
        Provider::Fixture => {
            info!("Using offline fixture provider.");
            return Ok(Arc::new(FixtureQuizGenerator));
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            (config.openai_api_key.as_ref(), OPENAI_API_BASE)
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            (config.gemini_api_key.as_ref(), GEMINI_API_BASE)
        }
    };
    let api_key = api_key.context("API key missing for the configured provider")?;

    let prompts = prompt::load_templates(&config.prompts_path).with_context(|| {
        format!(
            "Could not load prompts from {}",
            config.prompts_path.display()
        )
    })?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    Ok(Arc::new(LlmQuizGenerator::new(
        openai_config,
        config.chat_model.clone(),
        prompts,
        config.language.clone(),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let generator = build_generator(&config)?;
    let app_state = Arc::new(AppState {
        generator,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        reveal_delay_ms = config.reveal_delay.as_millis() as u64,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
