//! Example formatting.

use super::Example;
use serde::Serialize;

/// An example reduced to the two texts the prompt needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedExample {
    pub metadata_text: String,
    pub summary_text: String,
}

impl FormattedExample {
    /// Text embedded for similarity search: metadata, a space, the summary.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.metadata_text, self.summary_text)
    }
}

impl From<&Example> for FormattedExample {
    fn from(example: &Example) -> Self {
        Self {
            metadata_text: example.metadata().to_text(),
            summary_text: example.summary().to_string(),
        }
    }
}

/// Format stored examples for indexing and prompting. Order is preserved.
pub fn format_examples(examples: &[Example]) -> Vec<FormattedExample> {
    examples.iter().map(FormattedExample::from).collect()
}
