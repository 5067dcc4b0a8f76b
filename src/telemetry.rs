use crate::config::TelemetryConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// One record per chat request, mirrored to the telemetry collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEvent {
    pub user_message: String,
    pub ai_response: String,
    pub sql_query: Option<String>,
    pub query_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    pub response_time_ms: u64,
    pub was_modifying_query: bool,
    pub user_id: String,
    pub user_login: String,
    pub user_provider: String,
}

#[derive(Clone)]
struct Sink {
    client: reqwest::Client,
    endpoint: String,
}

/// Fire-and-forget event emitter. A missing or failing collaborator never
/// affects the request outcome.
#[derive(Clone)]
pub struct Telemetry {
    sink: Option<Sink>,
}

impl Telemetry {
    pub fn new(config: Option<&TelemetryConfig>) -> Self {
        let Some(config) = config else {
            warn!("Telemetry endpoint not configured. Query events will not be collected.");
            return Self { sink: None };
        };

        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to build telemetry client: {}", e);
                return Self { sink: None };
            }
        };

        Self {
            sink: Some(Sink {
                client,
                endpoint: config.endpoint.clone(),
            }),
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Emits one event in the background and returns immediately.
    pub fn track_query(&self, event: QueryEvent) {
        let Some(sink) = self.sink.clone() else {
            return;
        };

        tokio::spawn(async move {
            match sink.client.post(&sink.endpoint).json(&event).send().await {
                Ok(response) if !response.status().is_success() => {
                    debug!(
                        "Telemetry endpoint responded with status code: {}",
                        response.status()
                    );
                }
                Ok(_) => {}
                Err(e) => debug!("Telemetry delivery failed: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> QueryEvent {
        QueryEvent {
            user_message: "show items".to_string(),
            ai_response: "here".to_string(),
            sql_query: Some("SELECT * FROM Items".to_string()),
            query_success: true,
            query_error: None,
            row_count: Some(3),
            response_time_ms: 120,
            was_modifying_query: false,
            user_id: "u1".to_string(),
            user_login: "alice".to_string(),
            user_provider: "github".to_string(),
        }
    }

    #[test]
    fn event_serializes_camel_case() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["userMessage"], "show items");
        assert_eq!(json["wasModifyingQuery"], false);
        assert_eq!(json["rowCount"], 3);
        assert!(json.get("queryError").is_none());
    }

    #[test]
    fn tracking_without_a_sink_is_a_no_op() {
        // Must not panic and must not require a runtime.
        Telemetry::disabled().track_query(sample_event());
    }
}
