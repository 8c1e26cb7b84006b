//! In-process catalog, storage and auth.
//!
//! Serves the demo site when no hosted backend is configured and stands in for
//! the hosted services in tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backends::error::{AuthError, BackendError, StorageError};
use crate::backends::traits::{AuthProvider, CatalogBackend, ObjectStorage};
use crate::models::{
    AuthUser, NewPropertyImage, Property, PropertyFields, PropertyImage, Session,
};

#[derive(Default)]
struct CatalogState {
    properties: Vec<Property>,
    images: Vec<PropertyImage>,
}

/// Catalog held in memory, lost on restart
#[derive(Default)]
pub struct MemoryCatalog {
    state: RwLock<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(properties: Vec<Property>, images: Vec<PropertyImage>) -> Self {
        Self {
            state: RwLock::new(CatalogState { properties, images }),
        }
    }

    /// Demo listings so a fresh checkout renders a populated site
    pub fn seeded() -> Self {
        info!("📋 Seeding in-memory catalog with demo listings");
        let (properties, images) = demo_listings();
        Self::with_records(properties, images)
    }

    /// Every image row, for assertions
    pub async fn all_images(&self) -> Vec<PropertyImage> {
        self.state.read().await.images.clone()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn apply_fields(property: &mut Property, fields: PropertyFields) {
    property.title = fields.title;
    property.tagline = fields.tagline;
    property.description = fields.description;
    property.price = fields.price;
    property.location = fields.location;
    property.coordinates = fields.coordinates;
    property.slug = Some(fields.slug);
    property.main_image = fields.main_image;
    property.kind = fields.kind;
    property.bedrooms = fields.bedrooms;
}

#[async_trait]
impl CatalogBackend for MemoryCatalog {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    async fn list_properties(&self) -> Result<Vec<Property>, BackendError> {
        let mut properties = self.state.read().await.properties.clone();
        // newest first, undated records last
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, BackendError> {
        let state = self.state.read().await;
        Ok(state.properties.iter().find(|p| p.id == id).cloned())
    }

    async fn property_by_slug(&self, slug: &str) -> Result<Option<Property>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .properties
            .iter()
            .find(|p| p.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn list_images(&self, property_id: &str) -> Result<Vec<PropertyImage>, BackendError> {
        let state = self.state.read().await;
        let mut images: Vec<PropertyImage> = state
            .images
            .iter()
            .filter(|img| img.property_id == property_id)
            .cloned()
            .collect();
        images.sort_by_key(|img| img.display_order);
        Ok(images)
    }

    async fn create_property(
        &self,
        _token: &str,
        fields: PropertyFields,
    ) -> Result<Property, BackendError> {
        let mut property = Property {
            id: new_id(),
            title: String::new(),
            tagline: None,
            description: None,
            price: None,
            location: None,
            coordinates: None,
            slug: None,
            main_image: None,
            kind: None,
            bedrooms: None,
            created_at: Some(Utc::now()),
        };
        apply_fields(&mut property, fields);
        self.state.write().await.properties.push(property.clone());
        debug!("Inserted property {}", property.id);
        Ok(property)
    }

    async fn update_property(
        &self,
        _token: &str,
        id: &str,
        fields: PropertyFields,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let property = state
            .properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        apply_fields(property, fields);
        Ok(())
    }

    async fn set_main_image(&self, _token: &str, id: &str, image: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let property = state
            .properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        property.main_image = Some(image.to_string());
        Ok(())
    }

    async fn delete_property(&self, _token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let before = state.properties.len();
        state.properties.retain(|p| p.id != id);
        if state.properties.len() == before {
            return Err(BackendError::NotFound(id.to_string()));
        }
        // images cascade with their property
        state.images.retain(|img| img.property_id != id);
        Ok(())
    }

    async fn insert_images(
        &self,
        _token: &str,
        rows: Vec<NewPropertyImage>,
    ) -> Result<Vec<PropertyImage>, BackendError> {
        let mut state = self.state.write().await;
        let inserted: Vec<PropertyImage> = rows
            .into_iter()
            .map(|row| PropertyImage {
                id: new_id(),
                property_id: row.property_id,
                image: row.image,
                alt: row.alt,
                caption: None,
                display_order: row.display_order,
            })
            .collect();
        state.images.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn set_image_order(
        &self,
        _token: &str,
        image_id: &str,
        display_order: i32,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let image = state
            .images
            .iter_mut()
            .find(|img| img.id == image_id)
            .ok_or_else(|| BackendError::NotFound(image_id.to_string()))?;
        image.display_order = display_order;
        Ok(())
    }

    async fn delete_image(&self, _token: &str, image_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let before = state.images.len();
        state.images.retain(|img| img.id != image_id);
        if state.images.len() == before {
            return Err(BackendError::NotFound(image_id.to_string()));
        }
        Ok(())
    }
}

/// Stored object: bytes plus content type
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Bucket kept in memory; public URLs point at the `/media` route
pub struct MemoryStorage {
    bucket: String,
    public_base: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_base: "/media".to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn can_sign(&self) -> bool {
        false
    }

    async fn signed_url(&self, _key: &str, _expires_in: Duration) -> Result<String, StorageError> {
        Err(StorageError::NoServiceCredential)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key.trim_start_matches('/'))
    }

    async fn bucket_accessible(&self, _token: &str) -> Result<bool, StorageError> {
        Ok(true)
    }

    async fn upload(
        &self,
        _token: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Password accounts and opaque session tokens held in memory
#[derive(Default)]
pub struct MemoryAuth {
    accounts: HashMap<String, (String, AuthUser)>,
    sessions: RwLock<HashMap<String, AuthUser>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, email: &str, password: &str) -> Self {
        let email = email.trim().to_ascii_lowercase();
        let user = AuthUser {
            id: new_id(),
            email: Some(email.clone()),
        };
        self.accounts.insert(email, (password.to_string(), user));
        self
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_ascii_lowercase();
        let (expected, user) = self
            .accounts
            .get(&email)
            .ok_or(AuthError::InvalidCredentials)?;
        if expected != password {
            return Err(AuthError::InvalidCredentials);
        }
        let access_token = new_id();
        self.sessions
            .write()
            .await
            .insert(access_token.clone(), user.clone());
        Ok(Session {
            access_token,
            user: user.clone(),
        })
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}

fn demo_listings() -> (Vec<Property>, Vec<PropertyImage>) {
    struct Demo {
        id: &'static str,
        title: &'static str,
        price: i64,
        kind: &'static str,
        bedrooms: u32,
        location: &'static str,
        description: &'static str,
        images: usize,
    }

    let demos = [
        Demo {
            id: "p1",
            title: "Skyline 2BHK Apartment",
            price: 7_500_000,
            kind: "Apartment",
            bedrooms: 2,
            location: "Central City",
            description: "Bright 2BHK with balcony and city view. Modern kitchen, 2 baths.",
            images: 3,
        },
        Demo {
            id: "p2",
            title: "Seaside Luxury Villa",
            price: 25_000_000,
            kind: "Villa",
            bedrooms: 4,
            location: "Seaside",
            description: "Spacious villa with garden, pool and private parking.",
            images: 3,
        },
        Demo {
            id: "p3",
            title: "Urban Studio",
            price: 3_200_000,
            kind: "Studio",
            bedrooms: 1,
            location: "Downtown",
            description: "Compact studio ideal for young professionals. Great location.",
            images: 2,
        },
        Demo {
            id: "p4",
            title: "Business Park Office",
            price: 12_000_000,
            kind: "Office",
            bedrooms: 0,
            location: "Business Park",
            description: "Open-plan office space with high ceilings and natural light.",
            images: 2,
        },
        Demo {
            id: "p5",
            title: "Green Meadows 3BHK",
            price: 11_000_000,
            kind: "Apartment",
            bedrooms: 3,
            location: "Green Meadows",
            description: "Family-friendly 3BHK near parks and schools.",
            images: 3,
        },
        Demo {
            id: "p6",
            title: "Penthouse Royale",
            price: 45_000_000,
            kind: "Apartment",
            bedrooms: 5,
            location: "Uptown",
            description: "Top-floor penthouse with panoramic city views and private lift.",
            images: 3,
        },
    ];

    let mut properties = Vec::new();
    let mut images = Vec::new();
    for (n, demo) in demos.iter().enumerate() {
        let created_at = Utc.timestamp_opt(1_735_689_600 + n as i64 * 86_400, 0).single();
        properties.push(Property {
            id: demo.id.to_string(),
            title: demo.title.to_string(),
            tagline: None,
            description: Some(demo.description.to_string()),
            price: Some(demo.price),
            location: Some(demo.location.to_string()),
            coordinates: None,
            slug: Some(crate::naming::slugify(demo.title)),
            main_image: Some(format!("/static/properties/{}/1.svg", demo.id)),
            kind: Some(demo.kind.to_string()),
            bedrooms: Some(demo.bedrooms),
            created_at,
        });
        for i in 0..demo.images {
            images.push(PropertyImage {
                id: format!("{}-img{}", demo.id, i + 1),
                property_id: demo.id.to_string(),
                image: format!("/static/properties/{}/{}.svg", demo.id, i + 1),
                alt: Some(format!("{} photo {}", demo.title, i + 1)),
                caption: None,
                display_order: i as i32,
            });
        }
    }
    (properties, images)
}
