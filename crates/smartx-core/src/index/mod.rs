//! Page retrieval: pick the page of a document most relevant to a set of
//! topic phrases.
//!
//! Every document gets its own collection in the shared [`VectorStore`].
//! The collection lives only for the duration of [`PageIndexer::select_page`]
//! and is removed from the store when it returns, whether it succeeded,
//! failed, or was cancelled.

mod store;

pub use store::{Collection, QueryMatch, VectorStore, cosine_similarity, unique_collection_name};

#[cfg(test)]
pub(crate) use store::tests::KeywordEmbedder;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::IndexError;
use crate::llm::Embedder;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

const COLLECTION_PREFIX: &str = "invoice_collection";

/// How the per-topic hits are combined into one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryStrategy {
    /// Use the top hit of the first topic phrase.
    #[default]
    FirstTopic,
    /// Each topic's top hit is one vote; most votes wins.
    Consensus,
}

/// The page chosen for extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPage {
    /// Zero-based position in the input page sequence.
    pub index: usize,
    /// Page text.
    pub text: String,
    /// Similarity of the winning hit.
    pub score: f32,
}

/// Builds an ephemeral index over one document and retrieves its best page.
pub struct PageIndexer {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    topics: Vec<String>,
    strategy: QueryStrategy,
    results_per_query: usize,
}

impl PageIndexer {
    pub fn new(store: VectorStore, embedder: Arc<dyn Embedder>, topics: Vec<String>) -> Self {
        Self {
            store,
            embedder,
            topics,
            strategy: QueryStrategy::default(),
            results_per_query: 1,
        }
    }

    pub fn with_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_results_per_query(mut self, n: usize) -> Self {
        self.results_per_query = n.max(1);
        self
    }

    /// Index the pages and return the most relevant one.
    ///
    /// `Ok(None)` means no page matched: the sequence was empty or every
    /// page was blank.
    pub async fn select_page(&self, pages: &[String]) -> Result<Option<SelectedPage>> {
        let collection = self
            .store
            .create_collection(unique_collection_name(COLLECTION_PREFIX), self.embedder.clone())?;

        // Blank pages cannot be embedded and never match.
        let (ids, texts): (Vec<String>, Vec<String>) = pages
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i.to_string(), text.clone()))
            .unzip();

        debug!(
            collection = %collection.name(),
            pages = pages.len(),
            indexed = ids.len(),
            "Indexing document pages"
        );
        collection.add_documents(&ids, &texts).await?;

        if ids.is_empty() {
            return Ok(None);
        }

        let results = collection.query(&self.topics, self.results_per_query).await?;
        let winner = match self.strategy {
            QueryStrategy::FirstTopic => results.first().and_then(|hits| hits.first()).cloned(),
            QueryStrategy::Consensus => consensus(&results),
        };

        let selected = winner.and_then(|hit| {
            let index: usize = hit.id.parse().ok()?;
            Some(SelectedPage {
                index,
                text: hit.document,
                score: hit.score,
            })
        });

        if let Some(ref page) = selected {
            info!(page = page.index, score = page.score, strategy = ?self.strategy, "Selected page");
        }
        Ok(selected)
    }
}

/// Majority vote over each query's top hit.
///
/// Ties go to the larger summed score, then to the earlier page.
fn consensus(results: &[Vec<QueryMatch>]) -> Option<QueryMatch> {
    let mut tally: HashMap<&str, (usize, f32, &QueryMatch)> = HashMap::new();
    for hit in results.iter().filter_map(|hits| hits.first()) {
        let entry = tally.entry(hit.id.as_str()).or_insert((0, 0.0, hit));
        entry.0 += 1;
        entry.1 += hit.score;
    }

    tally
        .into_values()
        .max_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| page_number(b.2).cmp(&page_number(a.2)))
        })
        .map(|(_, _, hit)| hit.clone())
}

fn page_number(hit: &QueryMatch) -> usize {
    hit.id.parse().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::store::tests::KeywordEmbedder;
    use super::*;
    use crate::error::LlmError;
    use crate::llm;
    use async_trait::async_trait;

    struct UnreachableEmbedder;

    #[async_trait]
    impl Embedder for UnreachableEmbedder {
        async fn embed(&self, _texts: &[String]) -> llm::Result<Vec<Vec<f32>>> {
            Err(LlmError::Unavailable("connection refused".to_string()))
        }
    }

    fn topics() -> Vec<String> {
        vec![
            "Carbon emission terms".to_string(),
            "Supply chain terms".to_string(),
            "Emission factor terms".to_string(),
        ]
    }

    fn pages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn indexer(store: &VectorStore) -> PageIndexer {
        PageIndexer::new(store.clone(), Arc::new(KeywordEmbedder), topics())
    }

    #[tokio::test]
    async fn test_selects_most_relevant_page() {
        let store = VectorStore::new();
        let doc = pages(&[
            "Invoice total 500 USD",
            "Carbon emission factor for diesel fuel",
            "Terms and conditions",
        ]);

        let page = indexer(&store).select_page(&doc).await.unwrap().unwrap();
        assert_eq!(page.index, 1);
        assert_eq!(page.text, doc[1]);
        assert!(doc.contains(&page.text));
    }

    #[tokio::test]
    async fn test_empty_document_yields_no_match() {
        let store = VectorStore::new();
        let page = indexer(&store).select_page(&[]).await.unwrap();
        assert!(page.is_none());
    }

    #[tokio::test]
    async fn test_blank_pages_yield_no_match() {
        let store = VectorStore::new();
        let page = indexer(&store).select_page(&pages(&["", "  \n"])).await.unwrap();
        assert!(page.is_none());
    }

    #[tokio::test]
    async fn test_page_without_keywords_still_returned() {
        let store = VectorStore::new();
        let doc = pages(&["Lorem ipsum dolor"]);
        let page = indexer(&store).select_page(&doc).await.unwrap().unwrap();
        assert_eq!(page.index, 0);
        assert_eq!(page.text, "Lorem ipsum dolor");
    }

    #[tokio::test]
    async fn test_consensus_differs_from_first_topic() {
        let store = VectorStore::new();
        let doc = pages(&["carbon emission", "supply chain emission factor"]);

        let first = indexer(&store).select_page(&doc).await.unwrap().unwrap();
        assert_eq!(first.index, 0);

        let voted = indexer(&store)
            .with_strategy(QueryStrategy::Consensus)
            .select_page(&doc)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voted.index, 1);
    }

    #[tokio::test]
    async fn test_collection_disposed_after_selection() {
        let store = VectorStore::new();
        indexer(&store)
            .select_page(&pages(&["Carbon emission"]))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error_and_disposes() {
        let store = VectorStore::new();
        let indexer = PageIndexer::new(store.clone(), Arc::new(UnreachableEmbedder), topics());

        let err = indexer.select_page(&pages(&["Carbon"])).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_consensus_tie_prefers_higher_score_then_earlier_page() {
        let hit = |id: &str, score: f32| QueryMatch {
            id: id.to_string(),
            document: format!("page {id}"),
            score,
        };

        let by_score = consensus(&[vec![hit("0", 0.4)], vec![hit("1", 0.9)]]).unwrap();
        assert_eq!(by_score.id, "1");

        let by_order = consensus(&[vec![hit("3", 0.5)], vec![hit("2", 0.5)]]).unwrap();
        assert_eq!(by_order.id, "2");

        assert!(consensus(&[vec![], vec![]]).is_none());
    }
}
