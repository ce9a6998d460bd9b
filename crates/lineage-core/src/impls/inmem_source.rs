//! InMemorySource - 固定ページを返す SourceReader

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{AncestorId, LineageError};
use crate::ports::SourceReader;

/// Serves canned pages; an unknown id is a transport failure (like a 404).
#[derive(Default)]
pub struct InMemorySource {
    pages: HashMap<AncestorId, String>,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, ancestor_id: AncestorId, page: impl Into<String>) -> Self {
        self.pages.insert(ancestor_id, page.into());
        self
    }

    /// Number of `fetch` calls so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SourceReader for InMemorySource {
    async fn fetch(&self, ancestor_id: AncestorId) -> Result<String, LineageError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.pages
            .get(&ancestor_id)
            .cloned()
            .ok_or_else(|| LineageError::Transport(format!("no page for ancestor {ancestor_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_known_pages_and_counts_fetches() {
        let source = InMemorySource::new().with_page(AncestorId::new(1), "<html/>");
        assert_eq!(source.fetch(AncestorId::new(1)).await.unwrap(), "<html/>");
        assert!(matches!(
            source.fetch(AncestorId::new(2)).await,
            Err(LineageError::Transport(_))
        ));
        assert_eq!(source.fetches(), 2);
    }
}
