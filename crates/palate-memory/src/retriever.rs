//! Similarity-based retrieval: embed the question, search the index, return
//! the matching chunk texts in rank order.

use std::sync::Arc;

use palate_llm::LlmProvider;

use crate::error::MemoryError;
use crate::vector_store::VectorStore;

#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Maximum number of chunks returned per question.
    pub limit: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

pub struct Retriever<P> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    collection: String,
    config: RetrievalConfig,
}

impl<P: LlmProvider> Retriever<P> {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<P>,
        collection: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            provider,
            collection: collection.into(),
            config,
        }
    }

    /// The chunk texts most similar to `question`, best match first.
    ///
    /// Scores are dropped at this boundary; callers that need them use
    /// [`Retriever::retrieve_scored`].
    ///
    /// # Errors
    ///
    /// Propagates embedding and store failures unchanged.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>, MemoryError> {
        let scored = self.retrieve_scored(question).await?;
        Ok(scored.into_iter().map(|(text, _)| text).collect())
    }

    /// Like [`Retriever::retrieve`], keeping the similarity score of each
    /// chunk.
    ///
    /// # Errors
    ///
    /// Propagates embedding and store failures unchanged.
    pub async fn retrieve_scored(
        &self,
        question: &str,
    ) -> Result<Vec<(String, f32)>, MemoryError> {
        let vector = self.provider.embed(question).await?;
        let hits = self
            .store
            .search(&self.collection, vector, self.config.limit)
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let text = hit.payload.get("text")?.as_str()?.to_owned();
                Some((text, hit.score))
            })
            .collect())
    }
}
