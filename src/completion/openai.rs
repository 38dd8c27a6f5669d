//! OpenAI chat completion client.

use super::{Completer, Completion, ModelConfig};
use crate::config::OpenAISettings;
use crate::error::{Result, TldwError};
use crate::openai::{classify_error, create_client};
use crate::prompt::Prompt;
use async_openai::types::CreateChatCompletionRequestArgs;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Completer backed by the OpenAI chat completions API.
///
/// Holds only connection settings; the key, model and temperature arrive with
/// each call.
#[derive(Debug, Clone, Default)]
pub struct OpenAICompleter {
    settings: OpenAISettings,
}

impl OpenAICompleter {
    pub fn new(settings: OpenAISettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, prompt, config), fields(model = %config.model, turns = prompt.messages().len()))]
    async fn complete(&self, prompt: &Prompt, config: &ModelConfig) -> Result<Completion> {
        let client = create_client(&config.api_key, &self.settings)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(config.model.as_str())
            .messages(prompt.to_openai_messages()?)
            .temperature(config.temperature)
            .build()
            .map_err(|e| TldwError::Upstream(format!("Failed to build request: {}", e)))?;

        info!("Requesting summary from {}", config.model);
        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_error("Chat completion API", e))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TldwError::Upstream("Empty response from LLM".to_string()))?
            .clone();

        let (prompt_tokens, completion_tokens) = response
            .usage
            .as_ref()
            .map(|u| (Some(u.prompt_tokens), Some(u.completion_tokens)))
            .unwrap_or((None, None));
        debug!(?prompt_tokens, ?completion_tokens, "Completion received");

        Ok(Completion {
            content,
            model: response.model,
            prompt_tokens,
            completion_tokens,
        })
    }
}
