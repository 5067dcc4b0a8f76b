use crate::config::AppConfig;
use crate::db::catalog::{self, CatalogError, SchemaDescriptor};
use crate::llm::LlmManager;
use crate::telemetry::Telemetry;
use std::sync::Arc;

/// Shared application state for the web server.
///
/// Deliberately free of per-conversation state: the full history travels in
/// every request, so any instance can serve any request.
pub struct AppState {
    pub config: AppConfig,
    pub llm_manager: Arc<LlmManager>,
    pub telemetry: Telemetry,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager, telemetry: Telemetry) -> Self {
        Self {
            config,
            llm_manager: Arc::new(llm_manager),
            telemetry,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Describes the allow-listed portion of the configured database.
    pub async fn describe_schema(&self) -> Result<SchemaDescriptor, CatalogError> {
        catalog::describe_schema(&self.config.database.connection_string).await
    }
}
