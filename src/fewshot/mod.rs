//! Few-shot example bank.
//!
//! Examples are (video metadata, human-written summary) pairs kept in a flat
//! JSON file. At request time they are formatted into text pairs, embedded,
//! and the closest ones are shown to the model before the real query.

mod format;
mod store;

pub use format::{format_examples, FormattedExample};
pub use store::{append, contains, load};

use crate::video::VideoRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored few-shot example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Video link; unique within the store.
    pub link: String,
    #[serde(rename = "fewshotmapping")]
    pub mapping: FewShotMapping,
}

/// The input/output pair of an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FewShotMapping {
    pub metadata: Metadata,
    pub summary: String,
}

impl Example {
    pub fn new(link: impl Into<String>, metadata: Metadata, summary: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            mapping: FewShotMapping {
                metadata,
                summary: summary.into(),
            },
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.mapping.metadata
    }

    pub fn summary(&self) -> &str {
        &self.mapping.summary
    }
}

/// Metadata attached to an example or a query.
///
/// Each shape has one stringification rule (see [`Metadata::to_text`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    /// Free text, used verbatim.
    Text(String),
    /// A fetched video: transcript plus descriptive fields.
    Video(VideoRecord),
    /// Anything else; rendered as compact JSON with sorted keys.
    Other(Value),
}

impl Metadata {
    /// Deterministic text form used for embedding and prompting.
    pub fn to_text(&self) -> String {
        match self {
            Metadata::Text(text) => text.clone(),
            Metadata::Video(record) => record.to_text(),
            Metadata::Other(value) => canonical_json(value),
        }
    }

    /// Title of the video, when known.
    pub fn title(&self) -> Option<&str> {
        match self {
            Metadata::Video(record) => record.info.title.as_deref(),
            _ => None,
        }
    }
}

impl From<VideoRecord> for Metadata {
    fn from(record: VideoRecord) -> Self {
        Metadata::Video(record)
    }
}

/// Compact JSON with object keys sorted at every level.
fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}
