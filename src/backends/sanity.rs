//! Read-only catalog served from a headless CMS dataset through GROQ queries.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backends::error::BackendError;
use crate::backends::normalize::{normalize_images, normalize_properties, normalize_property};
use crate::backends::traits::CatalogBackend;
use crate::config::SanityConfig;
use crate::models::{Property, PropertyImage};

const PROPERTY_PROJECTION: &str = "{_id, _createdAt, publishedAt, title, tagline, description, \
    location, type, price, bedrooms, slug, coordinates, image{asset->{_id, url}}}";

const GALLERY_PROJECTION: &str =
    "{\"images\": images[]{_key, alt, caption, asset->{_id, url}}}";

pub struct SanityCatalog {
    http: Client,
    config: SanityConfig,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

impl SanityCatalog {
    pub fn new(config: SanityConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, config })
    }

    fn query_url(&self) -> String {
        let host = if self.config.use_cdn { "apicdn" } else { "api" };
        format!(
            "https://{}.{}.sanity.io/v{}/data/query/{}",
            self.config.project_id,
            host,
            self.config.api_version.trim_start_matches('v'),
            self.config.dataset
        )
    }

    async fn query(&self, groq: &str, params: &[(&str, &str)]) -> Result<Value, BackendError> {
        let mut query: Vec<(String, String)> = vec![("query".to_string(), groq.to_string())];
        for (name, value) in params {
            // GROQ parameters are JSON-encoded
            query.push((format!("${}", name), Value::String(value.to_string()).to_string()));
        }
        let response = self.http.get(self.query_url()).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("CMS query failed: {} {}", status, body);
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.result)
    }

    async fn single(&self, filter: &str, value: &str) -> Result<Option<Property>, BackendError> {
        let groq = format!(
            "*[_type == \"property\" && {}][0]{}",
            filter, PROPERTY_PROJECTION
        );
        let result = self.query(&groq, &[("key", value)]).await?;
        Ok(normalize_property(&result))
    }
}

#[async_trait]
impl CatalogBackend for SanityCatalog {
    fn source_name(&self) -> &'static str {
        "sanity"
    }

    async fn list_properties(&self) -> Result<Vec<Property>, BackendError> {
        let groq = format!(
            "*[_type == \"property\"] | order(coalesce(publishedAt, _createdAt) desc){}",
            PROPERTY_PROJECTION
        );
        let result = self.query(&groq, &[]).await?;
        let rows = result.as_array().cloned().unwrap_or_default();
        debug!("Fetched {} CMS documents", rows.len());
        Ok(normalize_properties(&rows))
    }

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, BackendError> {
        self.single("_id == $key", id).await
    }

    async fn property_by_slug(&self, slug: &str) -> Result<Option<Property>, BackendError> {
        self.single("slug.current == $key", slug).await
    }

    async fn list_images(&self, property_id: &str) -> Result<Vec<PropertyImage>, BackendError> {
        let groq = format!(
            "*[_type == \"property\" && _id == $key][0]{}",
            GALLERY_PROJECTION
        );
        let result = self.query(&groq, &[("key", property_id)]).await?;
        let rows = result
            .get("images")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(normalize_images(&rows, property_id))
    }
}
