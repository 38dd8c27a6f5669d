//! API key handling.
//!
//! The key is resolved once per request and then passed around explicitly.

use crate::error::{Result, TldwError};
use serde::{Deserialize, Serialize};

/// Environment variables checked for the OpenAI key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "OPEN_AI_KEY"];

/// An opaque API credential. `Debug` and `Display` never show the value.
///
/// Deserialized values go through [`ApiKey::new`], so padding is trimmed and a
/// blank value counts as empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ApiKey(String);

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        ApiKey::new(key)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// The raw key, for handing to the HTTP client only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short masked form such as `sk-abcd...wxyz`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return "****".to_string();
        }
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(****)")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "****")
    }
}

/// Resolve the API key from an explicit value, the environment, then the config file.
///
/// Empty values are skipped. Interactive prompting is left to the CLI.
pub fn resolve_api_key(explicit: Option<&str>, configured: Option<&ApiKey>) -> Option<ApiKey> {
    resolve_with_env(explicit, configured, |name| std::env::var(name).ok())
}

fn resolve_with_env(
    explicit: Option<&str>,
    configured: Option<&ApiKey>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<ApiKey> {
    if let Some(key) = explicit.map(ApiKey::new).filter(|k| !k.is_empty()) {
        return Some(key);
    }

    for name in API_KEY_ENV_VARS {
        if let Some(key) = env(name).map(ApiKey::new).filter(|k| !k.is_empty()) {
            return Some(key);
        }
    }

    configured.filter(|k| !k.is_empty()).cloned()
}

/// Like [`resolve_api_key`] but a missing key is an error.
pub fn require_api_key(explicit: Option<&str>, configured: Option<&ApiKey>) -> Result<ApiKey> {
    resolve_api_key(explicit, configured).ok_or_else(|| {
        TldwError::MissingApiKey(
            "set OPENAI_API_KEY, add openai.api_key to the config file, or pass --api-key"
                .to_string(),
        )
    })
}
