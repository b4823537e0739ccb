//! Local persistent vector store.
//!
//! Each collection lives in its own subdirectory of the index root as two
//! JSON files: `meta.json` (dimensionality, distance metric) and
//! `points.json` (id -> vector + payload). State is loaded once at open and
//! written through on every mutation, so deleting the index directory and
//! re-running ingestion is the reset procedure.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, cosine_similarity,
    rank,
};

const META_FILE: &str = "meta.json";
const POINTS_FILE: &str = "points.json";

#[derive(Serialize, Deserialize)]
struct CollectionMeta {
    vector_size: u64,
    distance: String,
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct DiskCollection {
    vector_size: u64,
    points: BTreeMap<u64, StoredPoint>,
}

pub struct DiskVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, DiskCollection>>,
}

impl std::fmt::Debug for DiskVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskVectorStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn io_err(e: &io::Error) -> VectorStoreError {
    VectorStoreError::Io(e.to_string())
}

fn serde_err(e: &serde_json::Error) -> VectorStoreError {
    VectorStoreError::Serialization(e.to_string())
}

impl DiskVectorStore {
    /// Open the store rooted at `root`, loading every collection found there.
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an existing
    /// collection file cannot be read or parsed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VectorStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_err(&e))?;

        let mut collections = HashMap::new();
        for entry in fs::read_dir(&root).map_err(|e| io_err(&e))? {
            let entry = entry.map_err(|e| io_err(&e))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(META_FILE).exists() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            collections.insert(name.to_owned(), load_collection(&path)?);
        }

        tracing::debug!(
            root = %root.display(),
            collections = collections.len(),
            "disk vector store opened"
        );

        Ok(Self {
            root,
            collections: RwLock::new(collections),
        })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn persist(&self, collection: &str, col: &DiskCollection) -> Result<(), VectorStoreError> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).map_err(|e| io_err(&e))?;

        let meta = CollectionMeta {
            vector_size: col.vector_size,
            distance: "cosine".into(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta).map_err(|e| serde_err(&e))?;
        fs::write(dir.join(META_FILE), meta_json).map_err(|e| io_err(&e))?;

        let points_json = serde_json::to_vec(&col.points).map_err(|e| serde_err(&e))?;
        fs::write(dir.join(POINTS_FILE), points_json).map_err(|e| io_err(&e))?;
        Ok(())
    }
}

fn load_collection(dir: &Path) -> Result<DiskCollection, VectorStoreError> {
    let meta_raw = fs::read(dir.join(META_FILE)).map_err(|e| io_err(&e))?;
    let meta: CollectionMeta = serde_json::from_slice(&meta_raw).map_err(|e| serde_err(&e))?;

    let points_path = dir.join(POINTS_FILE);
    let points = if points_path.exists() {
        let raw = fs::read(&points_path).map_err(|e| io_err(&e))?;
        serde_json::from_slice(&raw).map_err(|e| serde_err(&e))?
    } else {
        BTreeMap::new()
    };

    Ok(DiskCollection {
        vector_size: meta.vector_size,
        points,
    })
}

impl VectorStore for DiskVectorStore {
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
            let col = DiskCollection {
                vector_size,
                points: BTreeMap::new(),
            };
            self.persist(&collection, &col)?;
            cols.insert(collection, col);
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
            match fs::remove_dir_all(self.collection_dir(&collection)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(&e)),
            }
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

            // Validate every vector before touching the collection so a
            // mismatch leaves it unmodified.
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
            self.persist(&collection, col)
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
