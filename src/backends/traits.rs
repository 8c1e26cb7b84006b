use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::backends::error::{AuthError, BackendError, StorageError};
use crate::models::{AuthUser, NewPropertyImage, Property, PropertyFields, PropertyImage, Session};

/// Common trait for every catalog source.
///
/// Reads are public. Writes take the caller's access token so the backend can
/// apply its own row-level rules; read-only sources keep the default
/// implementations, which refuse the write.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Name of the backend, for logs
    fn source_name(&self) -> &'static str;

    /// All properties, newest first
    async fn list_properties(&self) -> Result<Vec<Property>, BackendError>;

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, BackendError>;

    async fn property_by_slug(&self, slug: &str) -> Result<Option<Property>, BackendError>;

    /// Gallery images of one property, ascending display order
    async fn list_images(&self, property_id: &str) -> Result<Vec<PropertyImage>, BackendError>;

    /// Slug lookup first, then id
    async fn get_property(&self, id_or_slug: &str) -> Result<Option<Property>, BackendError> {
        let key = id_or_slug.trim();
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(found) = self.property_by_slug(key).await? {
            return Ok(Some(found));
        }
        self.property_by_id(key).await
    }

    async fn create_property(
        &self,
        _token: &str,
        _fields: PropertyFields,
    ) -> Result<Property, BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn update_property(
        &self,
        _token: &str,
        _id: &str,
        _fields: PropertyFields,
    ) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn set_main_image(
        &self,
        _token: &str,
        _id: &str,
        _image: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn delete_property(&self, _token: &str, _id: &str) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn insert_images(
        &self,
        _token: &str,
        _rows: Vec<NewPropertyImage>,
    ) -> Result<Vec<PropertyImage>, BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn set_image_order(
        &self,
        _token: &str,
        _image_id: &str,
        _display_order: i32,
    ) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }

    async fn delete_image(&self, _token: &str, _image_id: &str) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly(self.source_name()))
    }
}

/// Object storage bucket holding uploaded images
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn bucket(&self) -> &str;

    /// Whether a service-level credential is available for signing URLs
    fn can_sign(&self) -> bool;

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;

    /// Public URL for a key; empty when the client cannot build one
    fn public_url(&self, key: &str) -> String;

    /// True when the bucket exists and the credential can list it
    async fn bucket_accessible(&self, token: &str) -> Result<bool, StorageError>;

    async fn upload(
        &self,
        token: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Session issuing and verification
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// `None` when the token is unknown or expired
    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;
}
