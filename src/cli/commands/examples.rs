//! Examples command: list the few-shot example store.

use crate::cli::Output;
use crate::config::Settings;
use crate::fewshot;
use anyhow::Result;

/// Run the examples command.
pub fn run_examples(examples: Option<String>, settings: Settings) -> Result<()> {
    let path = match examples {
        Some(path) => Settings::expand_path(&path),
        None => settings.examples_path(),
    };

    let entries = match fewshot::load(&path) {
        Ok(entries) => entries,
        Err(e) => {
            Output::error(&e.to_string());
            Output::info("Add one with: tldw add-example <url>");
            return Err(e.into());
        }
    };

    Output::header(&format!("Examples in {}", path.display()));

    if entries.is_empty() {
        Output::warning("The store is empty.");
        return Ok(());
    }

    for (i, example) in entries.iter().enumerate() {
        Output::example_entry(i + 1, &example.link, example.metadata().title(), example.summary());
    }
    println!();
    Output::info(&format!("{} example(s)", entries.len()));

    Ok(())
}
