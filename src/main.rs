use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod chat;
mod config;
mod db;
mod llm;
mod query;
mod telemetry;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::llm::LlmManager;
use crate::telemetry::Telemetry;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize the generation backend
    info!("Initializing LLM backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    // Telemetry is optional; a missing endpoint only disables event
    // collection.
    let telemetry = Telemetry::new(config.telemetry.as_ref());

    let app_state = Arc::new(AppState::new(config.clone(), llm_manager, telemetry));

    // Start the web server
    info!(
        "Starting nl-chat server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::other(e.to_string()).into());
        }
    }

    Ok(())
}
