pub mod error;
pub mod memory;
pub mod normalize;
pub mod sanity;
pub mod supabase;
pub mod traits;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{BackendConfig, Config};

pub use error::{AuthError, BackendError, StorageError};
pub use memory::{MemoryAuth, MemoryCatalog, MemoryStorage};
pub use sanity::SanityCatalog;
pub use supabase::{SupabaseAuth, SupabaseCatalog, SupabaseClient, SupabaseStorage};
pub use traits::{AuthProvider, CatalogBackend, ObjectStorage};

/// The data-access services selected by configuration
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogBackend>,
    /// `None` when no bucket is configured
    pub storage: Option<Arc<dyn ObjectStorage>>,
    pub auth: Arc<dyn AuthProvider>,
    /// Set when uploads live in process memory and are served from `/media`
    pub media: Option<Arc<MemoryStorage>>,
}

impl Backends {
    pub fn from_config(config: &Config) -> Result<Self> {
        let bucket = config.storage.bucket.clone();
        let backends = match &config.backend {
            BackendConfig::Supabase(supabase) => {
                let client = SupabaseClient::new(supabase.clone())?;
                Self {
                    catalog: Arc::new(SupabaseCatalog::new(client.clone())),
                    storage: bucket.map(|bucket| {
                        Arc::new(SupabaseStorage::new(client.clone(), bucket)) as Arc<dyn ObjectStorage>
                    }),
                    auth: Arc::new(SupabaseAuth::new(client)),
                    media: None,
                }
            }
            BackendConfig::Sanity(sanity) => {
                if bucket.is_some() {
                    warn!("STORAGE_BUCKET is ignored: the CMS catalog is read-only");
                }
                Self {
                    catalog: Arc::new(SanityCatalog::new(sanity.clone())?),
                    storage: None,
                    auth: Arc::new(demo_auth(config)),
                    media: None,
                }
            }
            BackendConfig::Memory => {
                let media = bucket.map(|bucket| Arc::new(MemoryStorage::new(bucket)));
                Self {
                    catalog: Arc::new(MemoryCatalog::seeded()),
                    storage: media.clone().map(|m| m as Arc<dyn ObjectStorage>),
                    auth: Arc::new(demo_auth(config)),
                    media,
                }
            }
        };
        info!(
            "📦 Catalog backend: {} (uploads {})",
            backends.catalog.source_name(),
            if backends.storage.is_some() { "enabled" } else { "disabled" }
        );
        Ok(backends)
    }
}

fn demo_auth(config: &Config) -> MemoryAuth {
    match (
        config.access.demo_admin_email.as_deref(),
        config.access.demo_admin_password.as_deref(),
    ) {
        (Some(email), Some(password)) => MemoryAuth::new().with_account(email, password),
        _ => MemoryAuth::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned()).unwrap()
    }

    #[test]
    fn memory_backend_without_bucket_has_no_storage() {
        let backends = Backends::from_config(&config(&[])).unwrap();
        assert_eq!(backends.catalog.source_name(), "memory");
        assert!(backends.storage.is_none());
        assert!(backends.media.is_none());
    }

    #[test]
    fn memory_backend_serves_media_when_bucket_set() {
        let backends = Backends::from_config(&config(&[("STORAGE_BUCKET", "uploads")])).unwrap();
        assert_eq!(backends.storage.unwrap().bucket(), "uploads");
        assert!(backends.media.is_some());
    }

    #[test]
    fn supabase_backend_wires_storage() {
        let backends = Backends::from_config(&config(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("STORAGE_BUCKET", "property-images"),
        ]))
        .unwrap();
        assert_eq!(backends.catalog.source_name(), "supabase");
        assert_eq!(backends.storage.unwrap().bucket(), "property-images");
    }
}
