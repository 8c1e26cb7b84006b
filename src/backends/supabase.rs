//! Hosted backend: PostgREST tables, storage bucket and password auth behind
//! one project URL.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backends::error::{AuthError, BackendError, StorageError};
use crate::backends::normalize::{normalize_images, normalize_properties, normalize_property};
use crate::backends::traits::{AuthProvider, CatalogBackend, ObjectStorage};
use crate::config::SupabaseConfig;
use crate::models::{
    AuthUser, Coordinates, NewPropertyImage, Property, PropertyFields, PropertyImage, Session,
};

const PROPERTY_COLUMNS: &str = "*";

/// Shared connection to one project. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: Arc<SupabaseConfig>,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("estate-showcase/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.config.url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    /// Anonymous request: reads that any visitor may perform
    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    /// Request on behalf of a signed-in user; row-level rules apply
    fn as_user(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    async fn select(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<Value>, BackendError> {
        let request = self.anon(self.http.get(self.rest(table)).query(query));
        let response = checked(request.send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn select_property(&self, column: &str, value: &str) -> Result<Option<Property>, BackendError> {
        let query = [
            ("select", PROPERTY_COLUMNS.to_string()),
            (column, format!("eq.{}", value)),
            ("limit", "1".to_string()),
        ];
        match self.select("properties", &query).await {
            Ok(rows) => Ok(rows.first().and_then(normalize_property)),
            // a non-uuid id is a malformed filter, which is just a miss here
            Err(BackendError::Http { status: 400, body }) => {
                debug!("Lookup {}={} rejected: {}", column, value, body);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

async fn checked(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("Backend refused request: {} {}", status, body);
            BackendError::Forbidden
        }
        _ => BackendError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

/// Column layout of the `properties` table
#[derive(Debug, Serialize)]
struct PropertyRow<'a> {
    title: &'a str,
    tagline: Option<&'a str>,
    description: Option<&'a str>,
    location: Option<&'a str>,
    price: Option<i64>,
    main_image_url: Option<&'a str>,
    slug: &'a str,
    // sent as null so an update clears stored coordinates
    coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bedrooms: Option<u32>,
}

impl<'a> From<&'a PropertyFields> for PropertyRow<'a> {
    fn from(fields: &'a PropertyFields) -> Self {
        Self {
            title: &fields.title,
            tagline: fields.tagline.as_deref(),
            description: fields.description.as_deref(),
            location: fields.location.as_deref(),
            price: fields.price,
            main_image_url: fields.main_image.as_deref(),
            slug: &fields.slug,
            coordinates: fields.coordinates,
            kind: fields.kind.as_deref(),
            bedrooms: fields.bedrooms,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRow<'a> {
    property_id: &'a str,
    image_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alt: Option<&'a str>,
    display_order: i32,
}

/// Catalog reads and writes against the `properties` and `property_images` tables
pub struct SupabaseCatalog {
    client: SupabaseClient,
}

impl SupabaseCatalog {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogBackend for SupabaseCatalog {
    fn source_name(&self) -> &'static str {
        "supabase"
    }

    async fn list_properties(&self) -> Result<Vec<Property>, BackendError> {
        let query = [
            ("select", PROPERTY_COLUMNS.to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", "500".to_string()),
        ];
        let rows = self.client.select("properties", &query).await?;
        debug!("Fetched {} property rows", rows.len());
        Ok(normalize_properties(&rows))
    }

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, BackendError> {
        self.client.select_property("id", id).await
    }

    async fn property_by_slug(&self, slug: &str) -> Result<Option<Property>, BackendError> {
        self.client.select_property("slug", slug).await
    }

    async fn list_images(&self, property_id: &str) -> Result<Vec<PropertyImage>, BackendError> {
        let query = [
            ("select", "*".to_string()),
            ("property_id", format!("eq.{}", property_id)),
            ("order", "display_order.asc".to_string()),
        ];
        let rows = self.client.select("property_images", &query).await?;
        Ok(normalize_images(&rows, property_id))
    }

    async fn create_property(&self, token: &str, fields: PropertyFields) -> Result<Property, BackendError> {
        let request = self
            .client
            .as_user(self.client.http.post(self.client.rest("properties")), token)
            .header("Prefer", "return=representation")
            .json(&[PropertyRow::from(&fields)]);
        let rows: Vec<Value> = checked(request.send().await?).await?.json().await?;
        rows.first()
            .and_then(normalize_property)
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))
    }

    async fn update_property(&self, token: &str, id: &str, fields: PropertyFields) -> Result<(), BackendError> {
        let request = self
            .client
            .as_user(self.client.http.patch(self.client.rest("properties")), token)
            .query(&[("id", format!("eq.{}", id))])
            .json(&PropertyRow::from(&fields));
        checked(request.send().await?).await?;
        Ok(())
    }

    async fn set_main_image(&self, token: &str, id: &str, image: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .as_user(self.client.http.patch(self.client.rest("properties")), token)
            .query(&[("id", format!("eq.{}", id))])
            .json(&json!({ "main_image_url": image }));
        checked(request.send().await?).await?;
        Ok(())
    }

    async fn delete_property(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .as_user(self.client.http.delete(self.client.rest("properties")), token)
            .query(&[("id", format!("eq.{}", id))]);
        checked(request.send().await?).await?;
        Ok(())
    }

    async fn insert_images(
        &self,
        token: &str,
        rows: Vec<NewPropertyImage>,
    ) -> Result<Vec<PropertyImage>, BackendError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let property_id = rows[0].property_id.clone();
        let body: Vec<ImageRow> = rows
            .iter()
            .map(|row| ImageRow {
                property_id: &row.property_id,
                image_url: &row.image,
                alt: row.alt.as_deref(),
                display_order: row.display_order,
            })
            .collect();
        let request = self
            .client
            .as_user(self.client.http.post(self.client.rest("property_images")), token)
            .header("Prefer", "return=representation")
            .json(&body);
        let inserted: Vec<Value> = checked(request.send().await?).await?.json().await?;
        Ok(normalize_images(&inserted, &property_id))
    }

    async fn set_image_order(&self, token: &str, image_id: &str, display_order: i32) -> Result<(), BackendError> {
        let request = self
            .client
            .as_user(self.client.http.patch(self.client.rest("property_images")), token)
            .query(&[("id", format!("eq.{}", image_id))])
            .json(&json!({ "display_order": display_order }));
        checked(request.send().await?).await?;
        Ok(())
    }

    async fn delete_image(&self, token: &str, image_id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .as_user(self.client.http.delete(self.client.rest("property_images")), token)
            .query(&[("id", format!("eq.{}", image_id))]);
        checked(request.send().await?).await?;
        Ok(())
    }
}

/// One bucket of the project's object storage
pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[derive(Deserialize)]
struct SignedUrl {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: Option<String>,
}

async fn storage_checked(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT || body.contains("Duplicate") {
        return Err(StorageError::AlreadyExists(body));
    }
    Err(StorageError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn can_sign(&self) -> bool {
        self.client.config.service_role_key.is_some()
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let service_key = self
            .client
            .config
            .service_role_key
            .as_deref()
            .ok_or(StorageError::NoServiceCredential)?;
        let url = self
            .client
            .storage_url(&format!("object/sign/{}/{}", self.bucket, key));
        let response = self
            .client
            .http
            .post(url)
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await?;
        let signed: SignedUrl = storage_checked(response)
            .await?
            .json()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        let path = signed.signed_url.ok_or(StorageError::MissingUrl)?;
        // the API answers with a path relative to /storage/v1
        Ok(format!(
            "{}/storage/v1/{}",
            self.client.config.url,
            path.trim_start_matches('/')
        ))
    }

    fn public_url(&self, key: &str) -> String {
        self.client
            .storage_url(&format!("object/public/{}/{}", self.bucket, key))
    }

    async fn bucket_accessible(&self, token: &str) -> Result<bool, StorageError> {
        let url = self.client.storage_url(&format!("object/list/{}", self.bucket));
        let response = self
            .client
            .as_user(self.client.http.post(url), token)
            .json(&json!({ "prefix": "", "limit": 1, "offset": 0 }))
            .send()
            .await?;
        match storage_checked(response).await {
            Ok(_) => Ok(true),
            Err(StorageError::Http { status, body }) if status == 400 || status == 404 => {
                warn!("Bucket {} not listable: {}", self.bucket, body);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn upload(&self, token: &str, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let url = self
            .client
            .storage_url(&format!("object/{}/{}", self.bucket, key));
        let response = self
            .client
            .as_user(self.client.http.post(url), token)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        storage_checked(response).await?;
        debug!("Uploaded {}/{}", self.bucket, key);
        Ok(())
    }
}

/// Password sign-in and token verification
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .anon(self.client.http.post(self.client.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let token: TokenResponse = response.json().await?;
        Ok(Session {
            access_token: token.access_token,
            user: token.user,
        })
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .client
            .as_user(self.client.http.get(self.client.auth_url("user")), token)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .as_user(self.client.http.post(self.client.auth_url("logout")), token)
            .send()
            .await?;
        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            return Err(AuthError::Http {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(service_role_key: Option<&str>) -> SupabaseClient {
        SupabaseClient::new(SupabaseConfig {
            url: "https://demo.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: service_role_key.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn public_url_layout() {
        let storage = SupabaseStorage::new(client(None), "property-images");
        assert_eq!(
            storage.public_url("properties/1-0-front.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/property-images/properties/1-0-front.jpg"
        );
        assert!(!storage.can_sign());
    }

    #[test]
    fn signing_needs_service_key() {
        let storage = SupabaseStorage::new(client(Some("service")), "b");
        assert!(storage.can_sign());
    }

    #[test]
    fn property_row_omits_absent_extras_but_nulls_coordinates() {
        let fields = PropertyFields {
            title: "Lake View Villa".to_string(),
            slug: "lake-view-villa".to_string(),
            ..Default::default()
        };
        let row = serde_json::to_value(PropertyRow::from(&fields)).unwrap();
        assert_eq!(row["title"], "Lake View Villa");
        assert_eq!(row["main_image_url"], Value::Null);
        assert!(row.get("kind").is_none());
        assert_eq!(row["coordinates"], Value::Null);
    }
}
