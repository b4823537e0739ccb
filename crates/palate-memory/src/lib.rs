//! Retrieval pipeline: corpus chunking, vector index lifecycle, ingestion
//! and similarity-based retrieval.
//!
//! The index is addressed through the [`VectorStore`] trait with a local
//! persistent implementation ([`DiskVectorStore`]), a remote Qdrant
//! implementation ([`QdrantStore`]) and a volatile one for tests
//! ([`InMemoryVectorStore`]).

pub mod chunker;
pub mod disk_store;
pub mod error;
pub mod in_memory_store;
pub mod ingest;
pub mod qdrant;
pub mod retriever;
pub mod vector_store;

pub use chunker::{Chunk, Chunker, ChunkerConfig};
pub use disk_store::DiskVectorStore;
pub use error::MemoryError;
pub use in_memory_store::InMemoryVectorStore;
pub use ingest::{IngestReport, IngestionPipeline};
pub use qdrant::QdrantStore;
pub use retriever::{RetrievalConfig, Retriever};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
