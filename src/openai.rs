//! OpenAI client construction and error classification.
//!
//! Clients are built per request from an explicit [`ApiKey`]; nothing here reads
//! the environment.

use crate::config::{ApiKey, OpenAISettings};
use crate::error::{Result, TldwError};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client for one request.
///
/// The client's built-in exponential backoff is switched off: a failed call is
/// reported to the caller as-is.
pub fn create_client(api_key: &ApiKey, settings: &OpenAISettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let mut config = OpenAIConfig::new().with_api_key(api_key.expose());
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }

    let no_retry = backoff::ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    };

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry))
}

/// Map an async-openai error onto the tldw taxonomy.
///
/// `context` prefixes the message, e.g. "Embedding API".
pub fn classify_error(context: &str, err: OpenAIError) -> TldwError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = format!("{}: {}", context, api.message);

            if code == "invalid_api_key"
                || code == "invalid_organization"
                || kind == "authentication_error"
                || api.message.contains("Incorrect API key")
            {
                TldwError::Authentication(message)
            } else if code == "rate_limit_exceeded"
                || code == "insufficient_quota"
                || kind == "insufficient_quota"
                || kind == "requests"
                || kind == "tokens"
            {
                TldwError::RateLimit(message)
            } else if code == "context_length_exceeded"
                || api.message.contains("maximum context length")
            {
                TldwError::ContextLengthExceeded(message)
            } else {
                TldwError::Upstream(message)
            }
        }
        OpenAIError::Reqwest(e) => TldwError::Upstream(format!("{}: {}", context, e)),
        other => TldwError::Upstream(format!("{}: {}", context, other)),
    }
}
