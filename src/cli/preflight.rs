//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{resolve_api_key, ApiKey, Settings};
use crate::error::{Result, TldwError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Summaries need yt-dlp and an API key.
    Summarize,
    /// Adding an example needs yt-dlp only.
    AddExample,
    /// Listing examples needs nothing external.
    ListExamples,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings, explicit_key: Option<&str>) -> Result<()> {
    match operation {
        Operation::Summarize => {
            check_tool("yt-dlp")?;
            check_api_key(settings, explicit_key)?;
        }
        Operation::AddExample => {
            check_tool("yt-dlp")?;
        }
        Operation::ListExamples => {}
    }
    Ok(())
}

/// Find an API key without prompting.
pub fn find_api_key(settings: &Settings, explicit_key: Option<&str>) -> Option<ApiKey> {
    resolve_api_key(explicit_key, settings.openai.api_key.as_ref())
}

fn check_api_key(settings: &Settings, explicit_key: Option<&str>) -> Result<()> {
    // An interactive terminal can still be asked for the key.
    if find_api_key(settings, explicit_key).is_some() || console::user_attended() {
        return Ok(());
    }
    Err(TldwError::MissingApiKey(
        "set OPENAI_API_KEY, add openai.api_key to the config file, or pass --api-key".to_string(),
    ))
}

/// Check if an external tool is available.
pub(crate) fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TldwError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TldwError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TldwError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
