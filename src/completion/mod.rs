//! Chat completion: model selection, per-request configuration and the client trait.

mod openai;

pub use openai::OpenAICompleter;

use crate::config::ApiKey;
use crate::error::{Result, TldwError};
use crate::prompt::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat models offered for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SummaryModel {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-3.5-turbo-16k")]
    Gpt35Turbo16k,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-32k")]
    Gpt4_32k,
    #[serde(rename = "gpt-4-1106-preview")]
    Gpt4_1106Preview,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl SummaryModel {
    pub const ALL: [SummaryModel; 7] = [
        SummaryModel::Gpt35Turbo,
        SummaryModel::Gpt35Turbo16k,
        SummaryModel::Gpt4,
        SummaryModel::Gpt4_32k,
        SummaryModel::Gpt4_1106Preview,
        SummaryModel::Gpt4o,
        SummaryModel::Gpt4oMini,
    ];

    /// API identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryModel::Gpt35Turbo => "gpt-3.5-turbo",
            SummaryModel::Gpt35Turbo16k => "gpt-3.5-turbo-16k",
            SummaryModel::Gpt4 => "gpt-4",
            SummaryModel::Gpt4_32k => "gpt-4-32k",
            SummaryModel::Gpt4_1106Preview => "gpt-4-1106-preview",
            SummaryModel::Gpt4o => "gpt-4o",
            SummaryModel::Gpt4oMini => "gpt-4o-mini",
        }
    }

    /// Advertised context window in tokens.
    pub fn context_window(&self) -> u32 {
        match self {
            SummaryModel::Gpt35Turbo => 4_096,
            SummaryModel::Gpt35Turbo16k => 16_384,
            SummaryModel::Gpt4 => 8_192,
            SummaryModel::Gpt4_32k => 32_768,
            SummaryModel::Gpt4_1106Preview | SummaryModel::Gpt4o | SummaryModel::Gpt4oMini => {
                128_000
            }
        }
    }
}

impl std::str::FromStr for SummaryModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SummaryModel::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = SummaryModel::ALL.iter().map(|m| m.as_str()).collect();
                format!("Unknown model: {}. Choose one of: {}", s, known.join(", "))
            })
    }
}

impl std::fmt::Display for SummaryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the completion call needs, built fresh for each request.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: SummaryModel,
    pub temperature: f32,
    pub api_key: ApiKey,
}

impl ModelConfig {
    /// Validate and build. Temperature must lie in `[0, 1]`.
    pub fn new(model: SummaryModel, temperature: f32, api_key: ApiKey) -> Result<Self> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(TldwError::InvalidInput(format!(
                "Temperature must be between 0.0 and 1.0, got {}",
                temperature
            )));
        }
        if api_key.is_empty() {
            return Err(TldwError::MissingApiKey("API key is empty".to_string()));
        }
        Ok(Self {
            model,
            temperature,
            api_key,
        })
    }
}

/// A model response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub content: String,
    /// Model that actually answered, as reported by the API.
    pub model: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Trait for chat completion services.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Send the prompt once and return the response. No retries.
    async fn complete(&self, prompt: &Prompt, config: &ModelConfig) -> Result<Completion>;
}
