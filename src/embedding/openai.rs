//! OpenAI embeddings implementation.

use super::{combine_embeddings, split_for_embedding, Embedder};
use crate::config::{ApiKey, EmbeddingSettings, OpenAISettings};
use crate::error::{Result, TldwError};
use crate::openai::{classify_error, create_client};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI has a limit on inputs per request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    max_input_chars: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder for one request.
    pub fn new(
        api_key: &ApiKey,
        openai: &OpenAISettings,
        settings: &EmbeddingSettings,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key, openai)?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            max_input_chars: settings.max_input_chars,
        })
    }

    async fn embed_pieces(&self, pieces: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(pieces.len());

        for chunk in pieces.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| TldwError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| classify_error("Embedding API", e))?;

            if response.data.len() != chunk.len() {
                return Err(TldwError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        Ok(all_embeddings)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| TldwError::Embedding("Empty embedding response".to_string()))
    }

    /// Texts longer than `max_input_chars` are embedded piecewise and the
    /// pieces averaged, so long transcripts stay within the model's input limit.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut pieces = Vec::new();
        let mut spans = Vec::with_capacity(texts.len());
        for text in texts {
            let split = split_for_embedding(text, self.max_input_chars);
            let weights: Vec<usize> = split.iter().map(|p| p.chars().count().max(1)).collect();
            spans.push((pieces.len(), weights));
            pieces.extend(split.into_iter().map(str::to_string));
        }

        debug!("Generating embeddings for {} texts ({} pieces)", texts.len(), pieces.len());
        let piece_embeddings = self.embed_pieces(pieces).await?;

        let embeddings = spans
            .into_iter()
            .map(|(start, weights)| {
                combine_embeddings(&piece_embeddings[start..start + weights.len()], &weights)
            })
            .collect();

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
