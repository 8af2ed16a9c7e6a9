//! In-process vector store with request-scoped collections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tracing::{debug, trace};

use super::Result;
use crate::error::IndexError;
use crate::llm::Embedder;

static COLLECTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a collection name that is unique within the process.
///
/// Seeded with a microsecond timestamp; the sequence suffix separates
/// collections created within the same tick.
pub fn unique_collection_name(prefix: &str) -> String {
    let seq = COLLECTION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}", prefix, Local::now().format("%Y%m%d%H%M%S%6f"), seq)
}

#[derive(Default)]
struct StoredCollection {
    ids: Vec<String>,
    documents: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

/// Process-wide registry of collections.
///
/// Cloning is cheap and shares the same registry.
#[derive(Clone, Default)]
pub struct VectorStore {
    inner: Arc<Mutex<HashMap<String, StoredCollection>>>,
}

/// One query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    /// Document id as given to `add_documents`.
    pub id: String,
    /// Document text.
    pub document: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredCollection>>> {
        self.inner.lock().map_err(|_| IndexError::Poisoned)
    }

    /// Register a new collection and return its scoped handle.
    ///
    /// The collection is removed from the store when the handle is dropped.
    pub fn create_collection(
        &self,
        name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Collection> {
        let name = name.into();
        let mut collections = self.lock()?;
        if collections.contains_key(&name) {
            return Err(IndexError::CollectionExists(name));
        }
        collections.insert(name.clone(), StoredCollection::default());
        debug!(collection = %name, "Created collection");

        Ok(Collection {
            name,
            store: self.clone(),
            embedder,
        })
    }

    /// Number of live collections.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a collection with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .lock()
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
    }
}

/// Handle to one collection in a [`VectorStore`].
pub struct Collection {
    name: String,
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embed and add documents under the given ids.
    pub async fn add_documents(&self, ids: &[String], texts: &[String]) -> Result<()> {
        if ids.len() != texts.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                texts: texts.len(),
            });
        }
        if texts.is_empty() {
            return Ok(());
        }

        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(IndexError::EmbeddingCount {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }

        let mut collections = self.store.lock()?;
        let collection = collections
            .get_mut(&self.name)
            .ok_or_else(|| IndexError::CollectionMissing(self.name.clone()))?;

        collection.ids.extend_from_slice(ids);
        collection.documents.extend_from_slice(texts);
        collection.embeddings.extend(embeddings);

        trace!(collection = %self.name, added = ids.len(), "Added documents");
        Ok(())
    }

    /// Query the collection; one result list per query text, best first.
    pub async fn query(&self, query_texts: &[String], top_k: usize) -> Result<Vec<Vec<QueryMatch>>> {
        if query_texts.is_empty() {
            return Ok(vec![]);
        }

        let query_embeddings = self.embedder.embed(query_texts).await?;
        if query_embeddings.len() != query_texts.len() {
            return Err(IndexError::EmbeddingCount {
                expected: query_texts.len(),
                actual: query_embeddings.len(),
            });
        }

        let collections = self.store.lock()?;
        let collection = collections
            .get(&self.name)
            .ok_or_else(|| IndexError::CollectionMissing(self.name.clone()))?;

        let results = query_embeddings
            .iter()
            .map(|query| {
                let mut scored: Vec<(usize, f32)> = collection
                    .embeddings
                    .iter()
                    .map(|doc| cosine_similarity(query, doc))
                    .enumerate()
                    .collect();
                // Stable sort keeps insertion order among equal scores.
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

                scored
                    .into_iter()
                    .take(top_k)
                    .map(|(i, score)| QueryMatch {
                        id: collection.ids[i].clone(),
                        document: collection.documents[i].clone(),
                        score,
                    })
                    .collect()
            })
            .collect();

        Ok(results)
    }
}

impl Drop for Collection {
    fn drop(&mut self) {
        if let Ok(mut collections) = self.store.inner.lock() {
            collections.remove(&self.name);
            debug!(collection = %self.name, "Removed collection");
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }

    let dot: f32 = a[..len].iter().zip(&b[..len]).map(|(x, y)| x * y).sum();
    let norm_a = a[..len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b[..len].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm;
    use async_trait::async_trait;

    const VOCAB: &[&str] = &[
        "carbon", "emission", "supply", "chain", "factor", "fuel", "diesel", "invoice",
        "total", "terms", "conditions",
    ];

    /// Counts vocabulary words; deterministic and offline.
    pub(crate) struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> llm::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; VOCAB.len()];
                    for word in text
                        .to_lowercase()
                        .split(|c: char| !c.is_alphanumeric())
                        .filter(|w| !w.is_empty())
                    {
                        if let Some(i) = VOCAB.iter().position(|v| *v == word) {
                            v[i] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_unique_collection_names() {
        let a = unique_collection_name("invoice_collection");
        let b = unique_collection_name("invoice_collection");
        assert_ne!(a, b);
        assert!(a.starts_with("invoice_collection_"));
    }

    #[test]
    fn test_duplicate_collection_rejected() {
        let store = VectorStore::new();
        let _first = store.create_collection("docs", Arc::new(KeywordEmbedder)).unwrap();
        let err = store
            .create_collection("docs", Arc::new(KeywordEmbedder))
            .err()
            .unwrap();
        assert!(matches!(err, IndexError::CollectionExists(_)));
    }

    #[test]
    fn test_collection_removed_on_drop() {
        let store = VectorStore::new();
        {
            let collection = store.create_collection("scoped", Arc::new(KeywordEmbedder)).unwrap();
            assert!(store.contains(collection.name()));
            assert_eq!(store.len(), 1);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let store = VectorStore::new();
        let collection = store.create_collection("rank", Arc::new(KeywordEmbedder)).unwrap();
        collection
            .add_documents(
                &strings(&["0", "1", "2"]),
                &strings(&[
                    "Invoice total 500 USD",
                    "Carbon emission factor for diesel fuel",
                    "Terms and conditions",
                ]),
            )
            .await
            .unwrap();

        let results = collection
            .query(&strings(&["Carbon emission terms"]), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[0][0].id, "1");
        assert_eq!(results[0][1].id, "2");
        assert!(results[0][0].score > results[0][1].score);
    }

    #[tokio::test]
    async fn test_add_documents_length_mismatch() {
        let store = VectorStore::new();
        let collection = store.create_collection("bad", Arc::new(KeywordEmbedder)).unwrap();
        let err = collection
            .add_documents(&strings(&["0"]), &strings(&["a", "b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::LengthMismatch { ids: 1, texts: 2 }));
    }

    #[tokio::test]
    async fn test_empty_collection_returns_no_matches() {
        let store = VectorStore::new();
        let collection = store.create_collection("empty", Arc::new(KeywordEmbedder)).unwrap();
        collection.add_documents(&[], &[]).await.unwrap();

        let results = collection.query(&strings(&["Carbon"]), 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_empty());
    }
}
