//! Corpus ingestion and index bootstrap.
//!
//! The collection moves absent -> creating -> populated in one pass: chunk
//! the corpus, embed the first chunk to learn the dimensionality, create the
//! collection, embed the rest and upsert everything in a single batch. A
//! failure anywhere aborts the run and leaves the collection absent or
//! partially populated; the only recovery is [`IngestionPipeline::rebuild`].

use std::collections::HashMap;
use std::sync::Arc;

use palate_llm::LlmProvider;

use crate::chunker::{Chunk, Chunker};
use crate::error::MemoryError;
use crate::vector_store::{VectorPoint, VectorStore};

#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub chunks: usize,
    pub vector_size: u64,
}

pub struct IngestionPipeline<P> {
    chunker: Chunker,
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    collection: String,
}

impl<P: LlmProvider> IngestionPipeline<P> {
    pub fn new(
        chunker: Chunker,
        store: Arc<dyn VectorStore>,
        provider: Arc<P>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            chunker,
            store,
            provider,
            collection: collection.into(),
        }
    }

    /// Ingest the corpus unless the collection already exists.
    ///
    /// Returns `None` when the existing collection was kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails or ingestion aborts.
    pub async fn ensure_ingested(&self, source: &str) -> Result<Option<IngestReport>, MemoryError> {
        if self.store.collection_exists(&self.collection).await? {
            tracing::debug!(collection = %self.collection, "collection present, skipping ingestion");
            return Ok(None);
        }
        self.ingest(source).await.map(Some)
    }

    /// Chunk, embed and index the corpus into a fresh collection.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::IngestionAborted`] if any embed or store call
    /// fails mid-run, and [`MemoryError::EmptyCorpus`] for a corpus that
    /// produces no chunks.
    pub async fn ingest(&self, source: &str) -> Result<IngestReport, MemoryError> {
        let chunks = self.chunker.chunk(source);
        if chunks.is_empty() {
            return Err(MemoryError::EmptyCorpus);
        }
        let total = chunks.len();

        // The first embedding fixes the collection dimensionality.
        let first_vector = self
            .provider
            .embed(&chunks[0].text)
            .await
            .map_err(|e| abort(0, total, e.into()))?;
        let vector_size = first_vector.len() as u64;

        self.store
            .create_collection(&self.collection, vector_size)
            .await
            .map_err(|e| abort(0, total, e.into()))?;

        let mut points = Vec::with_capacity(total);
        points.push(chunk_to_point(&chunks[0], first_vector));
        for chunk in &chunks[1..] {
            let vector = self
                .provider
                .embed(&chunk.text)
                .await
                .map_err(|e| abort(points.len(), total, e.into()))?;
            points.push(chunk_to_point(chunk, vector));
        }

        let completed = points.len();
        self.store
            .upsert(&self.collection, points)
            .await
            .map_err(|e| abort(completed, total, e.into()))?;

        tracing::info!(
            collection = %self.collection,
            chunks = total,
            vector_size,
            "corpus ingested"
        );

        Ok(IngestReport {
            chunks: total,
            vector_size,
        })
    }

    /// Drop the collection and ingest from scratch. This is the only
    /// supported recovery from a failed or stale index.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion or ingestion fails.
    pub async fn rebuild(&self, source: &str) -> Result<IngestReport, MemoryError> {
        self.store.delete_collection(&self.collection).await?;
        self.ingest(source).await
    }
}

fn abort(completed: usize, total: usize, source: MemoryError) -> MemoryError {
    MemoryError::IngestionAborted {
        completed,
        total,
        source: Box::new(source),
    }
}

fn chunk_to_point(chunk: &Chunk, vector: Vec<f32>) -> VectorPoint {
    VectorPoint {
        id: chunk.id,
        vector,
        payload: HashMap::from([("text".to_owned(), serde_json::json!(chunk.text))]),
    }
}
