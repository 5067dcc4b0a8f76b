use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the client-owned conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Token counts reported by the generation collaborator for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_token_count: u32,
    pub total_token_count: u32,
}

/// Free-text model reply plus whatever usage metadata the backend reported.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Advisory context-consumption snapshot returned to the client so it can
/// decide when to truncate its history. Best effort, never authoritative.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageSnapshot {
    pub prompt_token_count: u32,
    pub total_token_count: u32,
    pub context_window: u32,
}
