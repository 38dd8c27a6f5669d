//! Prompt templates for tldw.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for summary generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    /// Instructions for the summary itself.
    pub system: String,
    /// Appended to the system turn when few-shot examples follow.
    pub examples_note: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: r#"The following is metadata for a given video, including its transcript. Please summarize it concisely in one sentence, and then extract insights. Include timestamps.
The output should be formatted in markdown, and each insight should be enumerated and should begin with a representative emoji."#
                .to_string(),

            examples_note: r#"The following message records, denoted by "human" and "ai," give examples for how the summary should be formatted."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// System instructions for a summary request.
    ///
    /// The few-shot note is only added when `with_examples` is set, so a
    /// request without retrieved examples doesn't announce any.
    pub fn summary_instructions(&self, with_examples: bool) -> String {
        let mut text = Self::render(&self.summary.system, &self.variables);
        if with_examples {
            text.push_str("\n\n");
            text.push_str(&Self::render(&self.summary.examples_note, &self.variables));
        }
        text
    }
}
