//! Main Entrypoint for the T2DM Simulator API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading and validating the drug and case catalogs.
//! 3. Initializing the remote advisor gateway.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use t2dm_sim_api::{config::Config, router::create_router, state::AppState};
use t2dm_sim_core::{
    ContentStore,
    advisor::{RemoteAdvisor, gemini::GeminiClient},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
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

    // --- 3. Load Content ---
    let store = match &config.content_path {
        Some(dir) => ContentStore::load_dir(dir)
            .with_context(|| format!("Failed to load content from {}", dir.display()))?,
        None => ContentStore::builtin().context("Built-in content is invalid")?,
    };
    info!(
        drugs = store.drugs().len(),
        cases = store.cases().len(),
        "Content catalog loaded."
    );

    // --- 4. Initialize Remote Advisor ---
    let client = Arc::new(GeminiClient::new(config.gemini_api_base.clone()));
    let remote_advisor = Arc::new(RemoteAdvisor::new(
        client,
        config.gemini_api_key.clone(),
        config.gemini_model.as_deref(),
    ));
    if !remote_advisor.is_configured() {
        warn!("GEMINI_API_KEY is not set. The remote advisor will answer with a configuration error.");
    }

    let app_state = Arc::new(AppState {
        store: Arc::new(store),
        remote_advisor: remote_advisor.clone(),
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        models = ?remote_advisor.models(),
        bind_address = %config.bind_address,
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
