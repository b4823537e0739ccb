use crate::vector_store::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("embedding error: {0}")]
    Embedding(#[from] palate_llm::LlmError),

    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    #[error("ingestion aborted after {completed} of {total} chunk(s): {source}")]
    IngestionAborted {
        completed: usize,
        total: usize,
        source: Box<MemoryError>,
    },

    #[error("corpus produced no chunks")]
    EmptyCorpus,
}
