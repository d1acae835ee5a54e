//! Soft-failing retrieval over a [`PassageIndex`].

use std::sync::Arc;

use sojourn_core::types::{Passage, RetrievalResult};

use crate::index::PassageIndex;

/// Fetches ranked passages for a query.
///
/// Index failures never propagate: they are logged and degrade to an empty
/// result, so the caller proceeds straight to the fallback path.
#[derive(Clone)]
pub struct ContextRetriever {
    index: Arc<dyn PassageIndex>,
    top_k: usize,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn PassageIndex>, top_k: usize) -> Self {
        Self {
            index,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve at most `top_k` non-blank passages, best first.
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        match self.index.query(query, self.top_k).await {
            Ok(passages) => {
                let passages: Vec<Passage> = passages
                    .into_iter()
                    .filter_map(|p| {
                        let text = p.text.trim();
                        if text.is_empty() {
                            None
                        } else {
                            Some(Passage::new(text, p.source))
                        }
                    })
                    .take(self.top_k)
                    .collect();
                RetrievalResult::new(passages)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, continuing without context");
                RetrievalResult::empty()
            }
        }
    }
}
