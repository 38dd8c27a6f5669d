//! Summary pipeline.
//!
//! Coordinates one request: video fetch, example retrieval, prompt assembly
//! and the completion call. Nothing is carried over between requests except
//! the immutable settings, prompt templates and clients.

use crate::completion::{Completer, Completion, ModelConfig, OpenAICompleter, SummaryModel};
use crate::config::{require_api_key, ApiKey, Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TldwError};
use crate::fewshot::{self, format_examples, Metadata};
use crate::markdown::double_newlines;
use crate::prompt::{assemble, Prompt};
use crate::similarity::{Neighbor, SimilarityIndex};
use crate::video::{parse_video_id, LanguagePreference, VideoRecord, VideoSource, YtDlpSource};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds an embedder for a request's API key.
pub type EmbedderFactory = Arc<dyn Fn(&ApiKey) -> Result<Arc<dyn Embedder>> + Send + Sync>;

/// One summary request. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRequest {
    /// YouTube URL or video ID.
    pub link: String,
    #[serde(default)]
    pub model: Option<SummaryModel>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Few-shot example count.
    #[serde(default)]
    pub k: Option<usize>,
    /// Summarize without consulting the example store.
    #[serde(default)]
    pub skip_examples: bool,
    #[serde(default)]
    pub api_key: Option<ApiKey>,
}

impl SummaryRequest {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }
}

/// Validated per-request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub config: ModelConfig,
    /// Number of examples to retrieve; 0 means none.
    pub k: usize,
}

/// The assembled prompt and the examples it was built from.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub prompt: Prompt,
    pub neighbors: Vec<Neighbor>,
}

/// Result of a summary request.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub video: VideoRecord,
    /// Summary with paragraph breaks doubled, ready for rendering.
    pub markdown: String,
    pub completion: Completion,
    pub model: SummaryModel,
    pub neighbors: Vec<Neighbor>,
    pub prompt: Prompt,
}

/// The summary pipeline.
pub struct Summarizer {
    settings: Settings,
    prompts: Prompts,
    languages: LanguagePreference,
    video_source: Arc<dyn VideoSource>,
    completer: Arc<dyn Completer>,
    embedder_factory: EmbedderFactory,
}

impl Summarizer {
    /// Create a summarizer with the default YouTube and OpenAI components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let video_source: Arc<dyn VideoSource> = Arc::new(YtDlpSource::new()?);
        let completer: Arc<dyn Completer> = Arc::new(OpenAICompleter::new(settings.openai.clone()));

        let openai = settings.openai.clone();
        let embedding = settings.embedding.clone();
        let embedder_factory: EmbedderFactory = Arc::new(move |key: &ApiKey| {
            let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(key, &openai, &embedding)?);
            Ok(embedder)
        });

        Ok(Self::with_components(
            settings,
            prompts,
            video_source,
            completer,
            embedder_factory,
        ))
    }

    /// Create a summarizer with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        video_source: Arc<dyn VideoSource>,
        completer: Arc<dyn Completer>,
        embedder_factory: EmbedderFactory,
    ) -> Self {
        let languages = LanguagePreference::from(&settings.youtube);
        Self {
            settings,
            prompts,
            languages,
            video_source,
            completer,
            embedder_factory,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate a request against the configured defaults.
    pub fn resolve(&self, request: &SummaryRequest) -> Result<RequestOptions> {
        let api_key = match request.api_key.as_ref().filter(|k| !k.is_empty()) {
            Some(key) => key.clone(),
            None => require_api_key(None, self.settings.openai.api_key.as_ref())?,
        };

        let k = if request.skip_examples {
            0
        } else {
            let k = request.k.unwrap_or(self.settings.summary.k);
            if k == 0 {
                return Err(TldwError::InvalidInput(
                    "Few-shot example count must be at least 1".to_string(),
                ));
            }
            k
        };

        let config = ModelConfig::new(
            request.model.unwrap_or(self.settings.summary.model),
            request.temperature.unwrap_or(self.settings.summary.temperature),
            api_key,
        )?;

        Ok(RequestOptions { config, k })
    }

    /// Fetch the transcript and information for a link.
    pub async fn fetch_video(&self, link: &str) -> Result<VideoRecord> {
        if parse_video_id(link).is_none() {
            return Err(TldwError::InvalidInput(format!(
                "Invalid YouTube video link: {}. Please make sure the link is correct.",
                link
            )));
        }
        self.video_source.fetch(link, &self.languages).await
    }

    /// Assemble the few-shot prompt for an already stringified query.
    #[instrument(skip(self, query_text, api_key))]
    pub async fn prepare_prompt(
        &self,
        query_text: &str,
        k: usize,
        api_key: &ApiKey,
    ) -> Result<PreparedPrompt> {
        let neighbors = if k == 0 {
            Vec::new()
        } else {
            let path = self.settings.examples_path();
            let examples = fewshot::load(&path).map_err(|e| match e {
                TldwError::NotFound(msg) => TldwError::NotFound(format!(
                    "{}. Add one with `tldw add-example <url>` or summarize with --no-examples",
                    msg
                )),
                other => other,
            })?;
            let formatted = format_examples(&examples);

            let embedder = (self.embedder_factory)(api_key)?;
            let index = SimilarityIndex::build(formatted, embedder.as_ref()).await?;
            index.query(query_text, k, embedder.as_ref()).await?
        };

        let retrieved: Vec<_> = neighbors.iter().map(|n| n.example.clone()).collect();
        let instructions = self.prompts.summary_instructions(!retrieved.is_empty());
        let prompt = assemble(&instructions, &retrieved, query_text);
        info!("Prompt assembled with {} examples", prompt.example_count());

        Ok(PreparedPrompt { prompt, neighbors })
    }

    /// Summarize an already fetched video.
    #[instrument(skip(self, video, options), fields(model = %options.config.model, k = options.k))]
    pub async fn summarize_record(
        &self,
        video: VideoRecord,
        options: &RequestOptions,
    ) -> Result<SummaryResult> {
        let query_text = Metadata::Video(video.clone()).to_text();
        let prepared = self
            .prepare_prompt(&query_text, options.k, &options.config.api_key)
            .await?;

        let completion = self.completer.complete(&prepared.prompt, &options.config).await?;

        Ok(SummaryResult {
            video,
            markdown: double_newlines(&completion.content),
            completion,
            model: options.config.model,
            neighbors: prepared.neighbors,
            prompt: prepared.prompt,
        })
    }

    /// Run the whole pipeline for one request.
    #[instrument(skip(self, request), fields(link = %request.link))]
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        let options = self.resolve(request)?;
        let video = self.fetch_video(&request.link).await?;
        self.summarize_record(video, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fewshot::Example;
    use crate::prompt::{Message, Role};
    use crate::similarity::tests::TableEmbedder;
    use crate::video::VideoInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedSource(VideoRecord);

    #[async_trait]
    impl VideoSource for FixedSource {
        async fn fetch(&self, _link: &str, _languages: &LanguagePreference) -> Result<VideoRecord> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingCompleter {
        prompts: Mutex<Vec<Prompt>>,
        fail: Option<fn() -> TldwError>,
    }

    #[async_trait]
    impl Completer for RecordingCompleter {
        async fn complete(&self, prompt: &Prompt, config: &ModelConfig) -> Result<Completion> {
            self.prompts.lock().unwrap().push(prompt.clone());
            if let Some(fail) = self.fail {
                return Err(fail());
            }
            Ok(Completion {
                content: "One sentence.\n1. 🎯 [00:05] insight".to_string(),
                model: config.model.to_string(),
                prompt_tokens: None,
                completion_tokens: None,
            })
        }
    }

    fn record() -> VideoRecord {
        VideoRecord::new(
            "[00:05] hello".to_string(),
            VideoInfo {
                source: Some("dQw4w9WgXcQ".into()),
                title: Some("Query video".into()),
                ..Default::default()
            },
        )
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        summarizer: Summarizer,
        completer: Arc<RecordingCompleter>,
        embedder: Arc<TableEmbedder>,
    }

    fn fixture(examples: Option<Vec<Example>>, completer: RecordingCompleter) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.json");
        if let Some(examples) = examples {
            std::fs::write(&path, serde_json::to_string(&examples).unwrap()).unwrap();
        }

        let mut settings = Settings::default();
        settings.summary.examples_path = path.to_string_lossy().to_string();
        settings.openai.api_key = Some(ApiKey::new("sk-from-config"));

        let completer = Arc::new(completer);
        let embedder = Arc::new(TableEmbedder::new(&[
            ("M1 S1", [1.0, 0.0, 0.0]),
            ("M3 S3", [0.0, 1.0, 0.0]),
            ("M2", [0.9, 0.1, 0.0]),
        ]));
        let shared = embedder.clone();
        let factory: EmbedderFactory = Arc::new(move |_key: &ApiKey| {
            let embedder: Arc<dyn Embedder> = shared.clone();
            Ok(embedder)
        });

        let summarizer = Summarizer::with_components(
            settings,
            Prompts::default(),
            Arc::new(FixedSource(record())),
            completer.clone(),
            factory,
        );

        Fixture {
            _dir: dir,
            summarizer,
            completer,
            embedder,
        }
    }

    fn text_example(link: &str, meta: &str, summary: &str) -> Example {
        Example::new(link, Metadata::Text(meta.into()), summary)
    }

    #[tokio::test]
    async fn test_single_example_prompt() {
        let f = fixture(Some(vec![text_example("v1", "M1", "S1")]), RecordingCompleter::default());

        let prepared = f
            .summarizer
            .prepare_prompt("M2", 1, &ApiKey::new("sk-test"))
            .await
            .unwrap();

        let messages = prepared.prompt.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, Prompts::default().summary_instructions(true));
        assert_eq!(messages[1], Message::new(Role::Human, "M1"));
        assert_eq!(messages[2], Message::new(Role::Ai, "S1"));
        assert_eq!(messages[3], Message::new(Role::Human, "M2"));
    }

    #[tokio::test]
    async fn test_nearest_example_is_chosen() {
        let f = fixture(
            Some(vec![text_example("v3", "M3", "S3"), text_example("v1", "M1", "S1")]),
            RecordingCompleter::default(),
        );

        let prepared = f
            .summarizer
            .prepare_prompt("M2", 1, &ApiKey::new("sk-test"))
            .await
            .unwrap();
        assert_eq!(prepared.neighbors.len(), 1);
        assert_eq!(prepared.neighbors[0].example.metadata_text, "M1");
    }

    #[tokio::test]
    async fn test_missing_store_is_not_found() {
        let f = fixture(None, RecordingCompleter::default());
        let err = f
            .summarizer
            .prepare_prompt("M2", 1, &ApiKey::new("sk-test"))
            .await
            .unwrap_err();
        assert!(matches!(err, TldwError::NotFound(ref m) if m.contains("add-example")));
    }

    #[tokio::test]
    async fn test_summarize_end_to_end() {
        let f = fixture(Some(vec![text_example("v1", "M1", "S1")]), RecordingCompleter::default());

        let mut request = SummaryRequest::new("https://youtu.be/dQw4w9WgXcQ");
        request.temperature = Some(0.4);
        let result = f.summarizer.summarize(&request).await.unwrap();

        assert_eq!(result.markdown, "One sentence.\n\n1. 🎯 [00:05] insight");
        assert_eq!(result.model, SummaryModel::default());
        assert_eq!(result.neighbors.len(), 1);

        let sent = f.completer.prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let last = sent[0].messages().last().unwrap();
        assert_eq!(last.role, Role::Human);
        assert_eq!(last.content, record().to_text());
        // Examples embedded once at build, query once.
        assert_eq!(f.embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_skip_examples_needs_no_store() {
        let f = fixture(None, RecordingCompleter::default());

        let mut request = SummaryRequest::new("dQw4w9WgXcQ");
        request.skip_examples = true;
        let result = f.summarizer.summarize(&request).await.unwrap();

        assert_eq!(result.prompt.messages().len(), 2);
        assert_eq!(result.prompt.messages()[0].content, Prompts::default().summary_instructions(false));
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_requests_fail_before_any_call() {
        let f = fixture(Some(vec![text_example("v1", "M1", "S1")]), RecordingCompleter::default());

        let err = f.summarizer.summarize(&SummaryRequest::new("https://vimeo.com/1")).await.unwrap_err();
        assert!(matches!(err, TldwError::InvalidInput(_)));

        let mut request = SummaryRequest::new("dQw4w9WgXcQ");
        request.temperature = Some(1.5);
        assert!(matches!(f.summarizer.summarize(&request).await, Err(TldwError::InvalidInput(_))));

        let mut request = SummaryRequest::new("dQw4w9WgXcQ");
        request.k = Some(0);
        assert!(matches!(f.summarizer.summarize(&request).await, Err(TldwError::InvalidInput(_))));

        assert!(f.completer.prompts.lock().unwrap().is_empty());
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_aborts() {
        fn too_long() -> TldwError {
            TldwError::ContextLengthExceeded("too long".into())
        }
        let completer = RecordingCompleter {
            fail: Some(too_long as fn() -> TldwError),
            ..Default::default()
        };
        let f = fixture(Some(vec![text_example("v1", "M1", "S1")]), completer);

        let err = f.summarizer.summarize(&SummaryRequest::new("dQw4w9WgXcQ")).await.unwrap_err();
        assert!(matches!(err, TldwError::ContextLengthExceeded(_)));
    }

    #[test]
    fn test_blank_request_key_falls_back() {
        let f = fixture(None, RecordingCompleter::default());

        let request: SummaryRequest =
            serde_json::from_str(r#"{"link": "dQw4w9WgXcQ", "api_key": "   "}"#).unwrap();
        assert!(request.api_key.as_ref().is_some_and(ApiKey::is_empty));

        let options = f.summarizer.resolve(&request).unwrap();
        // Environment keys outrank the config file, so compare against the same lookup.
        let expected =
            crate::config::resolve_api_key(None, f.summarizer.settings().openai.api_key.as_ref()).unwrap();
        assert_eq!(options.config.api_key, expected);
        assert!(!options.config.api_key.is_empty());
    }

    #[test]
    fn test_resolve_prefers_request_key() {
        let f = fixture(None, RecordingCompleter::default());

        let mut request = SummaryRequest::new("dQw4w9WgXcQ");
        request.api_key = Some(ApiKey::new("sk-from-request"));
        request.model = Some(SummaryModel::Gpt4);
        let options = f.summarizer.resolve(&request).unwrap();

        assert_eq!(options.config.api_key.expose(), "sk-from-request");
        assert_eq!(options.config.model, SummaryModel::Gpt4);
        assert_eq!(options.k, 1);
    }
}
