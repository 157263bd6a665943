use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// URLs already acquired or claimed by some worker during this run.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct SeenUrls {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` seen; returns false if another worker got there first
    pub async fn claim(&self, url: &str) -> bool {
        self.inner.write().await.insert(url.to_string())
    }

    /// Mark `url` seen regardless of prior state
    pub async fn mark(&self, url: &str) {
        self.inner.write().await.insert(url.to_string());
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.inner.read().await.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
