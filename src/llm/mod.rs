pub mod models;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use models::{ChatTurn, GenerationOutput};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// A text-generation backend. Everything it returns is untrusted input and
/// must pass the classifier/gate before touching the database.
#[async_trait]
pub trait ChatGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ChatTurn],
    ) -> Result<GenerationOutput, LlmError>;

    /// Best-effort model context window in tokens, if the backend exposes
    /// one. Used only for the advisory usage snapshot.
    async fn context_window(&self) -> Option<u32> {
        None
    }
}

pub struct LlmManager {
    generator: Box<dyn ChatGenerator + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn ChatGenerator + Send + Sync> = match config.backend.as_str() {
            "gemini" => Box::new(providers::gemini::GeminiProvider::new(config)?),
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator })
    }

    #[cfg(test)]
    pub fn from_generator(generator: Box<dyn ChatGenerator + Send + Sync>) -> Self {
        Self { generator }
    }

    pub async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ChatTurn],
    ) -> Result<GenerationOutput, LlmError> {
        self.generator.generate(system_prompt, turns).await
    }

    pub async fn context_window(&self) -> Option<u32> {
        self.generator.context_window().await
    }
}
