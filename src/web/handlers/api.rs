use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::chat;
use crate::db::catalog::SchemaDescriptor;
use crate::db::executor::{self, ExecutionResult};
use crate::llm::models::{ChatTurn, TokenUsageSnapshot};
use crate::query::{self, Classification, GateDecision};
use crate::telemetry::QueryEvent;
use crate::web::identity::{self, UserIdentity};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub ai_response: String,
    pub sql_query: Option<String>,
    pub query_result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsageSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

// Chat pipeline: prompt build -> generation -> extraction -> classification
// and gating -> optional execution. Strictly sequential within one request.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let started = Instant::now();

    let user = identity::extract_identity(&headers);
    info!("Chat request from {} ({})", user.user_login, user.user_provider);

    let message = match payload.message.as_deref() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "Message is required")),
    };

    let schema = match state.describe_schema().await {
        Ok(schema) => schema,
        Err(e) => {
            error!("Schema introspection failed: {}", e);
            state
                .telemetry
                .track_query(failure_event(&message, e.to_string(), started, &user));
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ));
        }
    };

    let system_prompt = chat::system_prompt(&schema, state.config.policy);
    let turns = chat::build_prompt(&payload.history, &message);

    let generation = match state.llm_manager.generate(&system_prompt, &turns).await {
        Ok(generation) => generation,
        Err(e) => {
            error!("Generation failed: {}", e);
            state
                .telemetry
                .track_query(failure_event(&message, e.to_string(), started, &user));
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ));
        }
    };

    let mut ai_response = generation.text;
    let sql_query = chat::extract_query(&ai_response);
    debug!("Extracted SQL query: {:?}", sql_query);

    let mut query_result: Option<ExecutionResult> = None;
    let mut was_modifying_query = false;

    if let Some(sql) = &sql_query {
        let classification = query::classify(sql, state.config.policy);
        was_modifying_query = matches!(classification, Classification::Write);

        match query::gate(&classification, sql) {
            GateDecision::Execute(statement) => {
                query_result = Some(
                    executor::execute(&state.config.database.connection_string, &statement)
                        .await,
                );
            }
            GateDecision::Refuse { message, result } => {
                // A refusal is a conversational outcome, not a transport
                // error: the request still succeeds.
                if let Some(replacement) = message {
                    ai_response = replacement;
                }
                query_result = Some(result);
            }
        }
    }

    let token_usage = match generation.usage {
        Some(usage) => {
            state
                .llm_manager
                .context_window()
                .await
                .map(|context_window| TokenUsageSnapshot {
                    prompt_token_count: usage.prompt_token_count,
                    total_token_count: usage.total_token_count,
                    context_window,
                })
        }
        None => None,
    };

    state.telemetry.track_query(QueryEvent {
        user_message: message,
        ai_response: ai_response.clone(),
        sql_query: sql_query.clone(),
        query_success: query_result.as_ref().map(|r| r.success).unwrap_or(false),
        query_error: query_result.as_ref().and_then(|r| r.error.clone()),
        row_count: query_result.as_ref().and_then(|r| r.row_count),
        response_time_ms: started.elapsed().as_millis() as u64,
        was_modifying_query,
        user_id: user.user_id,
        user_login: user.user_login,
        user_provider: user.user_provider,
    });

    Ok(Json(ChatResponse {
        ai_response,
        sql_query,
        query_result,
        token_usage,
    }))
}

fn failure_event(
    message: &str,
    error: String,
    started: Instant,
    user: &UserIdentity,
) -> QueryEvent {
    QueryEvent {
        user_message: message.to_string(),
        ai_response: String::new(),
        sql_query: None,
        query_success: false,
        query_error: Some(error),
        row_count: None,
        response_time_ms: started.elapsed().as_millis() as u64,
        was_modifying_query: false,
        user_id: user.user_id.clone(),
        user_login: user.user_login.clone(),
        user_provider: user.user_provider.clone(),
    }
}

// Schema disclosure
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaDescriptor>, ApiError> {
    state.describe_schema().await.map(Json).map_err(|e| {
        error!("Failed to get schema: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
    })
}

// System status
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub table_count: usize,
}

pub async fn system_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemStatus>, ApiError> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    let table_count = state.describe_schema().await.map(|s| s.len()).map_err(|e| {
        error!("Failed to count tables: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
    })?;

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table_count,
    }))
}
