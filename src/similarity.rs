//! In-memory similarity index over formatted examples.
//!
//! Built per request from the example store; never mutated after build.

use crate::embedding::Embedder;
use crate::error::{Result, TldwError};
use crate::fewshot::FormattedExample;
use tracing::{debug, instrument};

/// An example together with its embedding.
#[derive(Debug, Clone)]
struct IndexedExample {
    example: FormattedExample,
    embedding: Vec<f32>,
}

/// A retrieved example and its cosine distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub example: FormattedExample,
    /// `1 - cosine_similarity`; lower is closer.
    pub distance: f32,
}

/// Nearest-neighbour index over example embeddings.
pub struct SimilarityIndex {
    entries: Vec<IndexedExample>,
}

impl SimilarityIndex {
    /// Embed every example once and build the index.
    ///
    /// An empty example list makes no embedding call.
    #[instrument(skip(examples, embedder), fields(count = examples.len()))]
    pub async fn build(examples: Vec<FormattedExample>, embedder: &dyn Embedder) -> Result<Self> {
        if examples.is_empty() {
            return Ok(Self { entries: Vec::new() });
        }

        let texts: Vec<String> = examples.iter().map(FormattedExample::embedding_text).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != examples.len() {
            return Err(TldwError::Embedding(format!(
                "Expected {} embeddings, got {}",
                examples.len(),
                embeddings.len()
            )));
        }

        let entries = examples
            .into_iter()
            .zip(embeddings)
            .map(|(example, embedding)| IndexedExample { example, embedding })
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed `text` and return up to `k` closest examples, closest first.
    ///
    /// Ties keep store order. `k == 0` or an empty index returns nothing
    /// without calling the embedder.
    #[instrument(skip(self, text, embedder))]
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<Neighbor>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = embedder.embed(text).await?;
        let neighbors = self.nearest(&query_embedding, k);
        debug!("Retrieved {} of {} examples", neighbors.len(), self.entries.len());
        Ok(neighbors)
    }

    /// Rank by distance to an already-computed query embedding.
    pub fn nearest(&self, query_embedding: &[f32], k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_distance(query_embedding, &entry.embedding)))
            .collect();

        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, distance)| Neighbor {
                example: self.entries[i].example.clone(),
                distance,
            })
            .collect()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder returning fixed vectors per text; unknown texts map to `[0, 0, 1]`.
    pub(crate) struct TableEmbedder {
        pub table: HashMap<String, Vec<f32>>,
        pub calls: AtomicUsize,
    }

    impl TableEmbedder {
        pub(crate) fn new(entries: &[(&str, [f32; 3])]) -> Self {
            Self {
                table: entries.iter().map(|(t, v)| (t.to_string(), v.to_vec())).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.embed_batch(&[text.to_string()]).await?.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(TldwError::RateLimit("slow down".into()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(TldwError::RateLimit("slow down".into()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn formatted(meta: &str, summary: &str) -> FormattedExample {
        FormattedExample {
            metadata_text: meta.to_string(),
            summary_text: summary.to_string(),
        }
    }

    fn store() -> (Vec<FormattedExample>, TableEmbedder) {
        let examples = vec![
            formatted("cooking", "pasta"),
            formatted("rust", "borrowck"),
            formatted("rust2", "lifetimes"),
            formatted("music", "jazz"),
        ];
        let embedder = TableEmbedder::new(&[
            ("cooking pasta", [0.0, 1.0, 0.0]),
            ("rust borrowck", [1.0, 0.0, 0.0]),
            ("rust2 lifetimes", [1.0, 0.0, 0.0]),
            ("music jazz", [0.7, 0.7, 0.0]),
            ("query about rust", [1.0, 0.1, 0.0]),
        ]);
        (examples, embedder)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
        assert!((cosine_distance(&a, &d) - 2.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_with_stable_ties() {
        let (examples, embedder) = store();
        let index = SimilarityIndex::build(examples, &embedder).await.unwrap();
        assert_eq!(index.len(), 4);

        let hits = index.query("query about rust", 3, &embedder).await.unwrap();
        let metas: Vec<_> = hits.iter().map(|h| h.example.metadata_text.as_str()).collect();
        assert_eq!(metas, vec!["rust", "rust2", "music"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(hits[0].distance, hits[1].distance);
    }

    #[tokio::test]
    async fn test_k_larger_than_store_returns_everything() {
        let (examples, embedder) = store();
        let index = SimilarityIndex::build(examples, &embedder).await.unwrap();

        for k in [4, 5, 100] {
            let hits = index.query("query about rust", k, &embedder).await.unwrap();
            assert_eq!(hits.len(), 4);
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
        for k in 1..=3 {
            assert_eq!(index.query("query about rust", k, &embedder).await.unwrap().len(), k);
        }
    }

    #[tokio::test]
    async fn test_empty_index_and_zero_k_skip_embedding() {
        let embedder = TableEmbedder::new(&[]);
        let index = SimilarityIndex::build(Vec::new(), &embedder).await.unwrap();
        assert!(index.is_empty());
        assert!(index.query("anything", 3, &embedder).await.unwrap().is_empty());
        assert_eq!(embedder.calls(), 0);

        let (examples, embedder) = store();
        let index = SimilarityIndex::build(examples, &embedder).await.unwrap();
        assert!(index.query("anything", 0, &embedder).await.unwrap().is_empty());
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_nan_embedding_keeps_finite_order() {
        let (mut examples, mut embedder) = store();
        examples.insert(1, formatted("broken", "vector"));
        embedder
            .table
            .insert("broken vector".to_string(), vec![f32::NAN, 0.0, 0.0]);
        let index = SimilarityIndex::build(examples, &embedder).await.unwrap();

        let hits = index.query("query about rust", 5, &embedder).await.unwrap();
        assert_eq!(hits.len(), 5);

        let finite: Vec<_> = hits
            .iter()
            .filter(|h| !h.distance.is_nan())
            .map(|h| h.example.metadata_text.as_str())
            .collect();
        assert_eq!(finite, vec!["rust", "rust2", "music", "cooking"]);
    }

    #[tokio::test]
    async fn test_embedding_errors_propagate() {
        let (examples, _) = store();
        let err = SimilarityIndex::build(examples, &FailingEmbedder).await.err().unwrap();
        assert!(matches!(err, TldwError::RateLimit(_)));
    }
}
