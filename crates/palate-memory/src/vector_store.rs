use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("collection already exists: {0}")]
    CollectionExists(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: u64, actual: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One indexed entry: a stable integer id, its embedding and the payload
/// stored alongside (the chunk text, for retrieval).
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: u64,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A named-collection vector index with cosine similarity search.
///
/// Collection dimensionality is fixed at creation; every implementation
/// rejects vectors of any other length. `create_collection` is deliberately
/// not idempotent — callers check `collection_exists` first and treat a
/// second creation as an error.
pub trait VectorStore: Send + Sync {
    fn create_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    /// Deleting an absent collection is a no-op.
    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Insert-or-overwrite by id. Fails without modifying the collection if
    /// any vector length differs from the collection's dimensionality.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// At most `limit` points ordered by descending cosine similarity,
    /// ties broken by ascending id.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn point_count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Order scored points by descending score, then ascending id, and truncate.
pub(crate) fn rank(mut scored: Vec<ScoredVectorPoint>, limit: u64) -> Vec<ScoredVectorPoint> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    #[expect(clippy::cast_possible_truncation)]
    scored.truncate(limit as usize);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![0.5, 0.5, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    fn point(id: u64, score: f32) -> ScoredVectorPoint {
        ScoredVectorPoint {
            id,
            score,
            payload: HashMap::new(),
        }
    }

    #[test]
    fn rank_orders_by_score_descending() {
        let ranked = rank(vec![point(0, 0.2), point(1, 0.9), point(2, 0.5)], 10);
        let ids: Vec<u64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn rank_breaks_ties_by_ascending_id() {
        let ranked = rank(vec![point(7, 0.5), point(3, 0.5), point(5, 0.5)], 10);
        let ids: Vec<u64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn rank_truncates_to_limit() {
        let ranked = rank(vec![point(0, 0.1), point(1, 0.2), point(2, 0.3)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, 2);
    }
}
