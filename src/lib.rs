//! tldw - Too Long; Didn't Watch
//!
//! Summarizes YouTube videos with an OpenAI chat model. Before asking for a
//! summary, the most similar hand-written summaries are pulled from a small
//! example store and shown to the model as worked examples, so the output
//! follows your own format and tone.
//!
//! # Architecture
//!
//! - `config` - Settings, credentials and prompt templates
//! - `video` - Transcript and metadata retrieval (yt-dlp + captions)
//! - `fewshot` - Example records, their text form and the JSON store
//! - `embedding` - Embedding generation
//! - `similarity` - In-memory nearest-neighbour selection
//! - `prompt` - Few-shot chat prompt assembly
//! - `completion` - Chat model selection and invocation
//! - `summarizer` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tldw::config::Settings;
//! use tldw::summarizer::{SummaryRequest, Summarizer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let summarizer = Summarizer::new(settings)?;
//!
//!     let result = summarizer
//!         .summarize(&SummaryRequest::new("https://youtu.be/dQw4w9WgXcQ"))
//!         .await?;
//!     println!("{}", result.markdown);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fewshot;
pub mod markdown;
pub mod openai;
pub mod prompt;
pub mod similarity;
pub mod summarizer;
pub mod video;

pub use error::{ErrorKind, Result, TldwError};
