//! Volatile vector store used by tests and as a reference implementation of
//! the trait semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, cosine_similarity,
    rank,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    vector_size: u64,
    points: BTreeMap<u64, StoredPoint>,
}

pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn create_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            if cols.contains_key(&collection) {
                return Err(VectorStoreError::CollectionExists(collection));
            }
            cols.insert(
                collection,
                InMemoryCollection {
                    vector_size,
                    points: BTreeMap::new(),
                },
            );
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            cols.remove(&collection);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.clone()))?;

            for p in &points {
                if p.vector.len() as u64 != col.vector_size {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected: col.vector_size,
                        actual: p.vector.len() as u64,
                    });
                }
            }

            for p in points {
                col.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.clone()))?;

            if vector.len() as u64 != col.vector_size {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: col.vector_size,
                    actual: vector.len() as u64,
                });
            }

            let scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|(id, sp)| ScoredVectorPoint {
                    id: *id,
                    score: cosine_similarity(&vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            Ok(rank(scored, limit))
        })
    }

    fn point_count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Io(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection))?;
            Ok(col.points.len() as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            id,
            vector,
            payload: HashMap::from([("text".into(), serde_json::json!(format!("chunk {id}")))]),
        }
    }

    #[tokio::test]
    async fn create_then_exists() {
        let store = InMemoryVectorStore::new();
        assert!(!store.collection_exists("test").await.unwrap());
        store.create_collection("test", 3).await.unwrap();
        assert!(store.collection_exists("test").await.unwrap());
    }

    #[tokio::test]
    async fn second_create_fails() {
        let store = InMemoryVectorStore::new();
        store.create_collection("test", 3).await.unwrap();
        let err = store.create_collection("test", 3).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionExists(_)));
    }

    #[tokio::test]
    async fn delete_collection_removes() {
        let store = InMemoryVectorStore::new();
        store.create_collection("test", 3).await.unwrap();
        store.delete_collection("test").await.unwrap();
        assert!(!store.collection_exists("test").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_and_search() {
        let store = InMemoryVectorStore::new();
        store.create_collection("test", 3).await.unwrap();
        store
            .upsert(
                "test",
                vec![point(0, vec![1.0, 0.0, 0.0]), point(1, vec![0.0, 1.0, 0.0])],
            )
            .await
            .unwrap();

        let results = store.search("test", vec![1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn upsert_overwrite_keeps_count() {
        let store = InMemoryVectorStore::new();
        store.create_collection("test", 2).await.unwrap();
        store
            .upsert("test", vec![point(0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("test", vec![point(0, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.point_count("test").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection("test", 3).await.unwrap();
        let err = store
            .upsert("test", vec![point(0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
        assert_eq!(store.point_count("test").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_missing_collection() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", vec![1.0], 5).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn default_impl() {
        let store = InMemoryVectorStore::default();
        assert!(!store.collection_exists("any").await.unwrap());
    }
}
