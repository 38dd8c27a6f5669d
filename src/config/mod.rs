//! Configuration module for tldw.
//!
//! Handles loading settings, prompt templates and the API credential.

mod credentials;
mod prompts;
mod settings;

pub use credentials::{require_api_key, resolve_api_key, ApiKey, API_KEY_ENV_VARS};
pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings, Settings,
    SummarySettings, YoutubeSettings,
};
