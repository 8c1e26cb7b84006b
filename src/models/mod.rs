use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair used for map placement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Core property record, as stored by the catalog backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    /// Whole currency units, currency-agnostic
    pub price: Option<i64>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub slug: Option<String>,
    /// Absolute URL, root-relative path or storage key
    pub main_image: Option<String>,
    /// Apartment, Villa, Office, ...
    pub kind: Option<String>,
    pub bedrooms: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Path segment used in public links: the slug when present, else the id
    pub fn route_key(&self) -> &str {
        match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => slug,
            _ => &self.id,
        }
    }
}

/// One entry of a property's ordered gallery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyImage {
    pub id: String,
    pub property_id: String,
    /// Absolute URL, root-relative path or storage key
    pub image: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub display_order: i32,
}

/// Editable property fields, used for both inserts and full updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFields {
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub slug: String,
    pub main_image: Option<String>,
    pub kind: Option<String>,
    pub bedrooms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPropertyImage {
    pub property_id: String,
    pub image: String,
    pub alt: Option<String>,
    pub display_order: i32,
}

/// Rendered gallery entry. Rebuilt on every render, never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GalleryItem {
    pub src: String,
    pub alt: String,
    pub caption: Option<String>,
    pub href: Option<String>,
}

/// Message sent through the contact form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Lead captured by the "request a callback" dialog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallbackRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Identity returned by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Tokens handed out after a successful sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
}
