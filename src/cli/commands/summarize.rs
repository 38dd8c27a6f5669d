//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::completion::SummaryModel;
use crate::config::{ApiKey, Settings};
use crate::summarizer::{SummaryRequest, Summarizer};
use crate::video::VideoRecord;
use anyhow::{Context, Result};
use console::Term;

/// Options for the summarize command.
#[derive(Debug, Default)]
pub struct SummarizeOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub k: Option<usize>,
    pub api_key: Option<String>,
    pub examples: Option<String>,
    pub no_examples: bool,
    pub output: Option<String>,
    pub show_prompt: bool,
}

/// Run the summarize command.
pub async fn run_summarize(url: &str, options: SummarizeOptions, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Summarize, &settings, options.api_key.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tldw doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(path) = &options.examples {
        settings.summary.examples_path = path.clone();
    }

    let model = options
        .model
        .as_deref()
        .map(str::parse::<SummaryModel>)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let api_key = match preflight::find_api_key(&settings, options.api_key.as_deref()) {
        Some(key) => key,
        None => prompt_api_key()?,
    };

    let request = SummaryRequest {
        link: url.to_string(),
        model,
        temperature: options.temperature,
        k: options.k,
        skip_examples: options.no_examples,
        api_key: Some(api_key),
    };

    let summarizer = Summarizer::new(settings)?;
    let request_options = summarizer.resolve(&request)?;

    let spinner = Output::spinner("Fetching transcript...");
    let video = match summarizer.fetch_video(url).await {
        Ok(video) => video,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to fetch video: {}", e));
            return Err(e.into());
        }
    };

    spinner.set_message(format!(
        "Summarizing '{}' with {}...",
        video.info.title.as_deref().unwrap_or(url),
        request_options.config.model
    ));
    let result = summarizer.summarize_record(video.clone(), &request_options).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Summary failed: {}", e));
            print_video_context(&video);
            return Err(e.into());
        }
    };

    if options.show_prompt {
        Output::header("Prompt");
        println!("{}\n", result.prompt.to_transcript());
        Output::header("Summary");
    }

    match &options.output {
        Some(path) => {
            let path = Settings::expand_path(path);
            std::fs::write(&path, &result.markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Output::success(&format!("Summary written to {}", path.display()));
        }
        None => println!("{}", result.markdown),
    }

    Output::info(&format!(
        "{} with {} example(s)",
        result.completion.model,
        result.neighbors.len()
    ));

    Ok(())
}

/// Ask for the key on the terminal without echoing it.
fn prompt_api_key() -> Result<ApiKey> {
    let term = Term::stderr();
    term.write_str("OpenAI API key: ")?;
    let key = ApiKey::new(term.read_secure_line()?);
    if key.is_empty() {
        anyhow::bail!("No API key entered");
    }
    Ok(key)
}

/// Show what was fetched so a failed summary still has context.
fn print_video_context(video: &VideoRecord) {
    Output::header("Video");
    if let Some(title) = &video.info.title {
        Output::kv("Title", title);
    }
    if let Some(author) = &video.info.author {
        Output::kv("Author", author);
    }
    if let Some(source) = &video.info.source {
        Output::kv("Source", &crate::video::watch_url(source));
    }
    Output::kv("Transcript", &format!("{} characters", video.transcript.chars().count()));
}
