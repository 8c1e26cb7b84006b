//! Rendered-page cache keyed by request path.
//!
//! Entries expire after the configured TTL and are dropped early by the
//! revalidation webhook and by admin mutations.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::models::Property;

const MAX_PAGES: u64 = 1_000;

#[derive(Clone)]
pub struct PageCache {
    inner: Cache<String, Arc<String>>,
}

/// `/listings/` and `/listings` share one entry
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let with_slash = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    let normalized = with_slash.trim_end_matches('/');
    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized.to_string()
    }
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_PAGES)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<Arc<String>> {
        self.inner.get(&normalize_path(path)).await
    }

    pub async fn insert(&self, path: &str, html: String) {
        self.inner.insert(normalize_path(path), Arc::new(html)).await;
    }

    pub async fn invalidate(&self, path: &str) {
        let key = normalize_path(path);
        debug!("Invalidating cached page {}", key);
        self.inner.invalidate(&key).await;
    }

    /// Every page that shows this property: home, listings and both detail URLs
    pub async fn invalidate_property(&self, property: &Property) {
        for path in property_paths(property) {
            self.invalidate(&path).await;
        }
    }

    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

pub fn property_paths(property: &Property) -> Vec<String> {
    let mut paths = vec![
        "/".to_string(),
        "/listings".to_string(),
        format!("/listings/{}", property.id),
    ];
    if let Some(slug) = property.slug.as_deref().filter(|s| !s.trim().is_empty()) {
        paths.push(format!("/listings/{}", slug));
    }
    paths
}
