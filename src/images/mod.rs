//! Turns stored image references into URLs a browser can load.
//!
//! A reference is one of: an absolute `http(s)` URL, a root-relative path, or a
//! key inside the storage bucket. Keys are signed when a privileged credential
//! exists, otherwise served through the bucket's public URL. Resolution never
//! fails outward; callers substitute [`PLACEHOLDER`] for `None`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::backends::ObjectStorage;

/// Shown wherever an image cannot be resolved
pub const PLACEHOLDER: &str = "/static/placeholder.svg";

#[derive(Clone)]
pub struct ImageResolver {
    storage: Option<Arc<dyn ObjectStorage>>,
    signed_url_ttl: Duration,
}

impl ImageResolver {
    pub fn new(storage: Option<Arc<dyn ObjectStorage>>, signed_url_ttl: Duration) -> Self {
        Self {
            storage,
            signed_url_ttl,
        }
    }

    pub async fn resolve(&self, raw: Option<&str>) -> Option<String> {
        let reference = raw.map(str::trim)?;
        if reference.is_empty() || reference == "null" || reference == "undefined" {
            return None;
        }
        if is_absolute(reference) || reference.starts_with('/') {
            return Some(reference.to_string());
        }

        let Some(storage) = self.storage.as_ref() else {
            error!("Cannot resolve storage key {}: no bucket configured", reference);
            return None;
        };

        if storage.can_sign() {
            match storage.signed_url(reference, self.signed_url_ttl).await {
                Ok(url) => return Some(url),
                Err(err) => warn!("Signing {} failed, trying public URL: {}", reference, err),
            }
        }

        let public = storage.public_url(reference);
        if public.is_empty() {
            debug!("No public URL for {}", reference);
            None
        } else {
            Some(public)
        }
    }

    /// Same as [`resolve`](Self::resolve) but never empty
    pub async fn resolve_or_placeholder(&self, raw: Option<&str>) -> String {
        self.resolve(raw)
            .await
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

fn is_absolute(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
