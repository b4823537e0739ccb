//! Remote Qdrant implementation of [`VectorStore`].
//!
//! Collection dimensionality is cached locally (and fetched from collection
//! info when unknown) so the dimension invariant fails fast, before any
//! network write.

use std::collections::HashMap;
use std::sync::RwLock;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions,
    value::Kind, vectors_config,
};

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, rank,
};

pub struct QdrantStore {
    client: Qdrant,
    dims: RwLock<HashMap<String, u64>>,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore").finish_non_exhaustive()
    }
}

fn qdrant_err(e: &qdrant_client::QdrantError) -> VectorStoreError {
    VectorStoreError::Connection(e.to_string())
}

impl QdrantStore {
    /// Create a new store connected to the given Qdrant URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| qdrant_err(&e))?;
        Ok(Self {
            client,
            dims: RwLock::new(HashMap::new()),
        })
    }

    fn cached_dims(&self, collection: &str) -> Option<u64> {
        self.dims.read().ok().and_then(|d| d.get(collection).copied())
    }

    fn cache_dims(&self, collection: &str, size: u64) {
        if let Ok(mut d) = self.dims.write() {
            d.insert(collection.to_owned(), size);
        }
    }

    async fn vector_size(&self, collection: &str) -> Result<u64, VectorStoreError> {
        if let Some(size) = self.cached_dims(collection) {
            return Ok(size);
        }

        if !self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| qdrant_err(&e))?
        {
            return Err(VectorStoreError::CollectionNotFound(collection.to_owned()));
        }

        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| qdrant_err(&e))?;
        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                vectors_config::Config::Params(p) => Some(p.size),
                vectors_config::Config::ParamsMap(_) => None,
            })
            .ok_or_else(|| {
                VectorStoreError::Connection(format!(
                    "collection {collection} has no single-vector config"
                ))
            })?;

        self.cache_dims(collection, size);
        Ok(size)
    }

    fn check_dims(expected: u64, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() as u64 != expected {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: vector.len() as u64,
            });
        }
        Ok(())
    }
}

impl VectorStore for QdrantStore {
    fn create_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| qdrant_err(&e))?
            {
                return Err(VectorStoreError::CollectionExists(collection));
            }

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&collection)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| qdrant_err(&e))?;

            self.cache_dims(&collection, vector_size);
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.client
                .collection_exists(&collection)
                .await
                .map_err(|e| qdrant_err(&e))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if let Ok(mut d) = self.dims.write() {
                d.remove(&collection);
            }
            if !self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| qdrant_err(&e))?
            {
                return Ok(());
            }
            self.client
                .delete_collection(&collection)
                .await
                .map_err(|e| qdrant_err(&e))?;
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
            let size = self.vector_size(&collection).await?;
            for p in &points {
                Self::check_dims(size, &p.vector)?;
            }

            let qdrant_points: Vec<PointStruct> = points
                .into_iter()
                .map(|p| {
                    let payload: HashMap<String, qdrant_client::qdrant::Value> =
                        serde_json::from_value(serde_json::Value::Object(
                            p.payload.into_iter().collect(),
                        ))
                        .unwrap_or_default();
                    PointStruct::new(p.id, p.vector, payload)
                })
                .collect();

            self.client
                .upsert_points(UpsertPointsBuilder::new(&collection, qdrant_points))
                .await
                .map_err(|e| qdrant_err(&e))?;
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
            let size = self.vector_size(&collection).await?;
            Self::check_dims(size, &vector)?;

            let results = self
                .client
                .search_points(
                    SearchPointsBuilder::new(&collection, vector, limit).with_payload(true),
                )
                .await
                .map_err(|e| qdrant_err(&e))?;

            let scored: Vec<ScoredVectorPoint> = results
                .result
                .into_iter()
                .filter_map(scored_point_to_vector)
                .collect();

            // Qdrant does not promise an id tie-break, so re-rank locally for
            // a deterministic order.
            Ok(rank(scored, limit))
        })
    }

    fn point_count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if !self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| qdrant_err(&e))?
            {
                return Err(VectorStoreError::CollectionNotFound(collection));
            }
            let response = self
                .client
                .count(CountPointsBuilder::new(&collection).exact(true))
                .await
                .map_err(|e| qdrant_err(&e))?;
            Ok(response.result.map_or(0, |r| r.count))
        })
    }
}

fn scored_point_to_vector(point: ScoredPoint) -> Option<ScoredVectorPoint> {
    let id = match point.id.and_then(|pid| pid.point_id_options)? {
        PointIdOptions::Num(n) => n,
        PointIdOptions::Uuid(_) => return None,
    };

    let payload: HashMap<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect();

    Some(ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    })
}
