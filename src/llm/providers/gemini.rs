use crate::config::LlmConfig;
use crate::llm::models::{ChatTurn, GenerationOutput, Role, TokenUsage};
use crate::llm::{ChatGenerator, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    // Memoized model context window: computed once per process, read many
    // times. Only set on a successful lookup so transient failures retry.
    context_window: OnceLock<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    input_token_limit: Option<u32>,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for the Gemini provider".to_string())
        })?;

        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            model: config.model.clone(),
            context_window: OnceLock::new(),
        })
    }

    fn content_from_turn(turn: &ChatTurn) -> Content {
        // Gemini names the assistant role "model".
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant => "model",
        };

        Content {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: turn.content.clone(),
            }],
        }
    }

    async fn fetch_context_window(&self) -> Result<u32, LlmError> {
        let url = format!("{}/models/{}", self.api_url, self.model);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::ResponseError(format!(
                "Model info request responded with status code: {}",
                response.status()
            )));
        }

        let info: ModelInfo = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        info.input_token_limit.ok_or_else(|| {
            LlmError::ResponseError("Model info is missing inputTokenLimit".to_string())
        })
    }
}

#[async_trait]
impl ChatGenerator for GeminiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ChatTurn],
    ) -> Result<GenerationOutput, LlmError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: turns.iter().map(Self::content_from_turn).collect(),
            generation_config: GenerationConfig { temperature: 0.1 },
        };

        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        info!("Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Gemini API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Gemini API responded with status code: {}{}",
                status, error_body
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let Some(content) = reply.candidates.into_iter().next().and_then(|c| c.content) else {
            return Err(LlmError::ResponseError(
                "No candidates in Gemini response".to_string(),
            ));
        };

        let text = content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        debug!("Gemini reply: {}", text);

        let usage = reply.usage_metadata.map(|meta| TokenUsage {
            prompt_token_count: meta.prompt_token_count,
            total_token_count: meta.total_token_count,
        });

        Ok(GenerationOutput { text, usage })
    }

    async fn context_window(&self) -> Option<u32> {
        if let Some(limit) = self.context_window.get() {
            return Some(*limit);
        }

        match self.fetch_context_window().await {
            Ok(limit) => {
                // A concurrent request may have set it first; both computed
                // the same value, so losing the race is harmless.
                let _ = self.context_window.set(limit);
                Some(limit)
            }
            Err(e) => {
                debug!("Context window lookup failed: {}", e);
                None
            }
        }
    }
}
