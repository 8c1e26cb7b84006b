//! Admin workflow: create and edit listings, upload and order their images.
//!
//! Every mutation carries the signed-in user's access token down to the
//! backend. Nothing here is transactional: a multi-step action that fails
//! half-way leaves the steps that already succeeded in place.

pub mod upload;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::backends::{BackendError, CatalogBackend, ObjectStorage, StorageError};
use crate::models::{Coordinates, NewPropertyImage, Property, PropertyFields, PropertyImage};
use crate::naming::{slug_or_fallback, slugify};

pub use upload::{ensure_bucket, upload_batch, UploadFile};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),
    #[error("Storage bucket is not configured (set STORAGE_BUCKET)")]
    MissingBucket,
    #[error("Storage bucket '{0}' does not exist or is not accessible with the current credentials")]
    BucketUnavailable(String),
    #[error("Upload failed for {file}: {source}")]
    Upload {
        file: String,
        #[source]
        source: StorageError,
    },
    #[error("Property not found")]
    NotFound,
    #[error("Failed to save order for {failed} of {total} images")]
    ReorderFailed { failed: usize, total: usize },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Property form input after trimming; not yet checked for a title
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyInput {
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: Option<i64>,
    pub coordinates: Option<Coordinates>,
    pub kind: Option<String>,
    pub bedrooms: Option<u32>,
    /// Explicit slug from the edit form; derived from the title when blank
    pub slug: Option<String>,
}

fn optional(fields: &HashMap<String, String>, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
    message: &str,
) -> Result<Option<T>, AdminError> {
    match optional(fields, name) {
        Some(raw) => raw
            .replace(',', "")
            .parse()
            .map(Some)
            .map_err(|_| AdminError::Validation(message.to_string())),
        None => Ok(None),
    }
}

impl PropertyInput {
    /// Read the text fields of the admin form
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, AdminError> {
        let lat: Option<f64> = parse_field(fields, "lat", "Latitude must be a number")?;
        let lng: Option<f64> = parse_field(fields, "lng", "Longitude must be a number")?;
        let coordinates = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            (None, None) => None,
            _ => {
                return Err(AdminError::Validation(
                    "Latitude and longitude go together".to_string(),
                ))
            }
        };
        Ok(Self {
            title: fields.get("title").map(|t| t.trim().to_string()).unwrap_or_default(),
            tagline: optional(fields, "tagline"),
            description: optional(fields, "description"),
            location: optional(fields, "location"),
            price: parse_field(fields, "price", "Price must be a whole number")?,
            coordinates,
            kind: optional(fields, "kind"),
            bedrooms: parse_field(fields, "bedrooms", "Bedrooms must be a whole number")?,
            slug: optional(fields, "slug"),
        })
    }

    fn require_title(&self) -> Result<(), AdminError> {
        if self.title.trim().is_empty() {
            return Err(AdminError::Validation("Title is required".to_string()));
        }
        Ok(())
    }

    fn into_fields(self, slug: String, main_image: Option<String>) -> PropertyFields {
        PropertyFields {
            title: self.title.trim().to_string(),
            tagline: self.tagline,
            description: self.description,
            price: self.price,
            location: self.location,
            coordinates: self.coordinates,
            slug,
            main_image,
            kind: self.kind,
            bedrooms: self.bedrooms,
        }
    }
}

/// Every image of the property, each exactly once
fn check_complete_order(current: &[PropertyImage], image_ids: &[String]) -> Result<(), AdminError> {
    let known: HashSet<&str> = current.iter().map(|img| img.id.as_str()).collect();
    let mut seen = HashSet::new();
    for id in image_ids {
        if !known.contains(id.as_str()) {
            return Err(AdminError::Validation(format!(
                "Image {} does not belong to this property",
                id
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(AdminError::Validation(format!(
                "Image {} is listed more than once",
                id
            )));
        }
    }
    if seen.len() != known.len() {
        return Err(AdminError::Validation(format!(
            "The new order must list all {} images of this property",
            known.len()
        )));
    }
    Ok(())
}

/// Admin-side operations over the configured catalog and bucket
#[derive(Clone)]
pub struct AdminService {
    backend: Arc<dyn CatalogBackend>,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl AdminService {
    pub fn new(backend: Arc<dyn CatalogBackend>, storage: Option<Arc<dyn ObjectStorage>>) -> Self {
        Self { backend, storage }
    }

    /// True when a bucket is configured at all
    pub fn uploads_configured(&self) -> bool {
        self.storage.is_some()
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.storage.as_deref().map(|s| s.bucket())
    }

    pub async fn list(&self) -> Result<Vec<Property>, AdminError> {
        Ok(self.backend.list_properties().await?)
    }

    /// Property plus its images in display order
    pub async fn load(&self, id: &str) -> Result<(Property, Vec<PropertyImage>), AdminError> {
        let property = self
            .backend
            .property_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)?;
        let images = self.backend.list_images(id).await?;
        Ok((property, images))
    }

    /// Create a listing. The first upload becomes the main image, the rest
    /// become gallery rows ordered 1, 2, ...
    pub async fn create_property(
        &self,
        token: &str,
        input: PropertyInput,
        files: &[UploadFile],
    ) -> Result<Property, AdminError> {
        input.require_title()?;
        let keys = upload_batch(self.storage.as_deref(), token, files).await?;

        let slug = slug_or_fallback(&input.title, Utc::now());
        let main_image = keys.first().cloned();
        let fields = input.into_fields(slug, main_image);
        let property = self.backend.create_property(token, fields).await?;
        info!("🏠 Created property {} ({})", property.title, property.id);

        let rows: Vec<NewPropertyImage> = keys
            .iter()
            .enumerate()
            .skip(1)
            .map(|(order, key)| NewPropertyImage {
                property_id: property.id.clone(),
                image: key.clone(),
                alt: None,
                display_order: order as i32,
            })
            .collect();
        self.insert_gallery_rows(token, &property.id, rows).await;
        Ok(property)
    }

    /// Rewrite the editable fields and append any new uploads to the gallery.
    ///
    /// New rows continue from the current highest order; the first upload
    /// becomes the main image only when the property has none.
    pub async fn update_property(
        &self,
        token: &str,
        id: &str,
        input: PropertyInput,
        files: &[UploadFile],
    ) -> Result<Property, AdminError> {
        input.require_title()?;
        let (existing, images) = self.load(id).await?;
        let keys = upload_batch(self.storage.as_deref(), token, files).await?;

        let slug = input
            .slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .or_else(|| existing.slug.clone().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| slug_or_fallback(&input.title, Utc::now()));

        let mut new_keys = keys.into_iter();
        let main_image = match existing.main_image.clone().filter(|m| !m.trim().is_empty()) {
            Some(current) => Some(current),
            None => new_keys.next(),
        };

        let fields = input.into_fields(slug, main_image);
        self.backend.update_property(token, id, fields).await?;

        let next_order = images
            .iter()
            .map(|img| img.display_order)
            .max()
            .map_or(0, |max| max + 1);
        let rows: Vec<NewPropertyImage> = new_keys
            .enumerate()
            .map(|(i, key)| NewPropertyImage {
                property_id: id.to_string(),
                image: key,
                alt: None,
                display_order: next_order + i as i32,
            })
            .collect();
        self.insert_gallery_rows(token, id, rows).await;

        info!("✏️  Updated property {}", id);
        self.backend
            .property_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)
    }

    // The listing already exists at this point, so a failed gallery insert is
    // logged rather than reported.
    async fn insert_gallery_rows(&self, token: &str, property_id: &str, rows: Vec<NewPropertyImage>) {
        if rows.is_empty() {
            return;
        }
        let count = rows.len();
        if let Err(err) = self.backend.insert_images(token, rows).await {
            error!(
                "Failed to insert {} gallery rows for {}: {}",
                count, property_id, err
            );
        }
    }

    /// Persist a new gallery order: `display_order` becomes the index in `image_ids`.
    ///
    /// `image_ids` must name every image of the property exactly once.
    pub async fn reorder_images(
        &self,
        token: &str,
        property_id: &str,
        image_ids: &[String],
    ) -> Result<(), AdminError> {
        let current = self.backend.list_images(property_id).await?;
        check_complete_order(&current, image_ids)?;

        let results = join_all(
            image_ids
                .iter()
                .enumerate()
                .map(|(index, image_id)| self.backend.set_image_order(token, image_id, index as i32)),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            warn!("Reorder write for {} failed: {}", property_id, err);
        }
        if failed > 0 {
            return Err(AdminError::ReorderFailed {
                failed,
                total: image_ids.len(),
            });
        }
        info!("Saved order of {} images for {}", image_ids.len(), property_id);
        Ok(())
    }

    /// Point the main image at one of the property's gallery images
    pub async fn set_main_image(&self, token: &str, property_id: &str, image_id: &str) -> Result<(), AdminError> {
        let (_, images) = self.load(property_id).await?;
        let image = images
            .iter()
            .find(|img| img.id == image_id)
            .ok_or(AdminError::NotFound)?;
        self.backend
            .set_main_image(token, property_id, &image.image)
            .await?;
        Ok(())
    }

    /// Remove one gallery image. `property_id` is only used for the log line.
    pub async fn delete_image(&self, token: &str, image_id: &str, property_id: Option<&str>) -> Result<(), AdminError> {
        self.backend.delete_image(token, image_id).await?;
        info!(
            "🗑️  Deleted image {} of {}",
            image_id,
            property_id.unwrap_or("unknown property")
        );
        Ok(())
    }

    /// Remove the listing; returns it so callers can invalidate its pages
    pub async fn delete_property(&self, token: &str, id: &str) -> Result<Property, AdminError> {
        let property = self
            .backend
            .property_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)?;
        self.backend.delete_property(token, id).await?;
        info!("🗑️  Deleted property {} ({})", property.title, id);
        Ok(property)
    }
}
