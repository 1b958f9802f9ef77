// ABOUTME: Retrieval seam for specialist agents
// ABOUTME: The vector store is an external collaborator behind the Retriever trait

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use aviary_anchor::RetrievedDocument;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid corpus file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RetrieverResult<T> = Result<T, RetrieverError>;

/// Fetches the passages a query will be answered from.
///
/// A production deployment plugs a vector-similarity backend in here; the
/// contract is only "return the `n_results` most relevant passages".
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, n_results: usize)
        -> RetrieverResult<Vec<RetrievedDocument>>;
}

/// Corpus-in-memory stand-in for a vector store, used by tests and small
/// deployments. Ranks by naive term overlap; the anchoring threshold is what
/// actually guards answer quality.
pub struct StaticRetriever {
    documents: Vec<RetrievedDocument>,
}

impl StaticRetriever {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of `{text, source}` objects.
    pub fn from_file(path: &str) -> RetrieverResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let documents: Vec<RetrievedDocument> = serde_json::from_str(&content)?;
        info!("Loaded {} corpus document(s) from {path}", documents.len());
        Ok(Self::new(documents))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

fn overlap_score(query: &str, text: &str) -> usize {
    let haystack = text.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|term| term.chars().count() >= 3)
        .filter(|term| haystack.contains(term))
        .count()
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(
        &self,
        query: &str,
        n_results: usize,
    ) -> RetrieverResult<Vec<RetrievedDocument>> {
        let mut scored: Vec<(usize, &RetrievedDocument)> = self
            .documents
            .iter()
            .map(|document| (overlap_score(query, &document.text), document))
            .collect();
        // Stable sort keeps corpus order among equally-scored documents.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(n_results)
            .map(|(_, document)| document.clone())
            .collect())
    }
}
