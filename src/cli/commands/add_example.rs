//! Add-example command: grow the few-shot example store.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::TldwError;
use crate::fewshot::{self, Example, Metadata};
use crate::video::{parse_video_id, LanguagePreference, VideoSource, YtDlpSource};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the add-example command.
pub async fn run_add_example(
    url: &str,
    summary_file: Option<String>,
    editor: Option<String>,
    examples: Option<String>,
    settings: Settings,
) -> Result<()> {
    let store_path = match examples {
        Some(path) => Settings::expand_path(&path),
        None => settings.examples_path(),
    };

    if parse_video_id(url).is_none() {
        let err = TldwError::InvalidInput(format!("Invalid YouTube video link: {}", url));
        Output::error(&err.to_string());
        return Err(err.into());
    }

    // Nothing is written for a link that is already present.
    if fewshot::contains(&store_path, url)? {
        let err = TldwError::DuplicateLink(url.to_string());
        Output::error(&err.to_string());
        return Err(err.into());
    }

    if let Err(e) = preflight::check(Operation::AddExample, &settings, None) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tldw doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let summary = match summary_file {
        Some(path) => read_summary_file(&Settings::expand_path(&path))?,
        None => {
            let editor = editor
                .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
                .unwrap_or_else(|| "nano".to_string());
            Output::info(&format!("Write your summary in {}, then save and exit.", editor));
            edit_summary(&editor).await?
        }
    };

    let spinner = Output::spinner("Fetching video metadata...");
    let source = YtDlpSource::new()?;
    let record = source
        .fetch(url, &LanguagePreference::from(&settings.youtube))
        .await;
    spinner.finish_and_clear();
    let record = record.map_err(|e| {
        Output::error(&format!("Failed to fetch video: {}", e));
        e
    })?;

    let title = record.info.title.clone();
    let count = fewshot::append(&store_path, Example::new(url, Metadata::Video(record), summary))?;

    Output::success(&format!(
        "Added '{}' to {} ({} examples)",
        title.as_deref().unwrap_or(url),
        store_path.display(),
        count
    ));

    Ok(())
}

/// Read a summary from a file. Blank summaries are rejected.
fn read_summary_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary file {}", path.display()))?;
    non_empty_summary(content)
}

/// Open `editor` on a temporary file and return what was written.
async fn edit_summary(editor: &str) -> Result<String> {
    let file = tempfile::Builder::new()
        .prefix("tldw-summary-")
        .suffix(".md")
        .tempfile()?;

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("nano");

    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TldwError::ToolNotFound(program.to_string())
            } else {
                TldwError::Io(e)
            }
        })?;

    if !status.success() {
        anyhow::bail!("Editor exited with {}", status);
    }

    non_empty_summary(std::fs::read_to_string(file.path())?)
}

fn non_empty_summary(content: String) -> Result<String> {
    let summary = content.trim();
    if summary.is_empty() {
        return Err(TldwError::InvalidInput("Summary is empty; nothing added".to_string()).into());
    }
    Ok(summary.to_string())
}
