//! Read side of the site: listing cards, property detail and the home gallery.
//!
//! Every view is built from the [`CatalogBackend`] records with image
//! references passed through the [`ImageResolver`]. Listing pages degrade to an
//! empty list when the backend fails; a detail lookup reports the failure so
//! the caller can tell "missing" from "unreachable".

pub mod filter;
pub mod format;
pub mod gallery;

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::backends::{BackendError, CatalogBackend};
use crate::config::SiteConfig;
use crate::images::ImageResolver;
use crate::models::{GalleryItem, Property};

pub use filter::ListingFilter;
pub use format::{map_links, whatsapp_link, MapLinks, PriceFormat, PriceLocale};
pub use gallery::{build_gallery, dedupe_by_src, home_gallery, DETAIL_GALLERY_LIMIT};

/// Shown on cards when a property has no price
pub const PRICE_ON_REQUEST: &str = "Price on request";

/// Shown on the detail card when a property has no price
pub const PRICE_MISSING: &str = "—";

/// Properties highlighted on the home page
const FEATURED_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub property: Property,
    pub href: String,
    pub image: String,
    pub price_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDetail {
    pub property: Property,
    pub gallery: Vec<GalleryItem>,
    pub price_label: String,
    pub map: Option<MapLinks>,
    pub whatsapp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    pub gallery: Vec<GalleryItem>,
    pub featured: Vec<ListingCard>,
}

#[derive(Clone)]
pub struct Catalog {
    backend: Arc<dyn CatalogBackend>,
    resolver: ImageResolver,
    site: SiteConfig,
}

impl Catalog {
    pub fn new(backend: Arc<dyn CatalogBackend>, resolver: ImageResolver, site: SiteConfig) -> Self {
        Self {
            backend,
            resolver,
            site,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CatalogBackend> {
        &self.backend
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// All properties, or an empty list when the backend is unavailable
    pub async fn properties(&self) -> Vec<Property> {
        match self.backend.list_properties().await {
            Ok(properties) => properties,
            Err(err) => {
                error!(
                    "Failed to list properties from {}: {}",
                    self.backend.source_name(),
                    err
                );
                Vec::new()
            }
        }
    }

    async fn card(&self, property: Property) -> ListingCard {
        let image = self
            .resolver
            .resolve_or_placeholder(property.main_image.as_deref())
            .await;
        let price_label = self
            .site
            .price_format
            .format(property.price)
            .unwrap_or_else(|| PRICE_ON_REQUEST.to_string());
        ListingCard {
            href: format!("/listings/{}", property.route_key()),
            image,
            price_label,
            property,
        }
    }

    pub async fn listing_cards(&self, filter: &ListingFilter) -> Vec<ListingCard> {
        let properties = filter.apply(self.properties().await);
        join_all(properties.into_iter().map(|p| self.card(p))).await
    }

    pub async fn home(&self) -> HomeView {
        let properties = self.properties().await;
        let gallery = home_gallery(&self.resolver, &properties).await;
        let featured = join_all(
            properties
                .into_iter()
                .take(FEATURED_COUNT)
                .map(|p| self.card(p)),
        )
        .await;
        HomeView { gallery, featured }
    }

    /// `Ok(None)` when neither a slug nor an id matches
    pub async fn detail(&self, id_or_slug: &str) -> Result<Option<PropertyDetail>, BackendError> {
        let Some(property) = self.backend.get_property(id_or_slug).await? else {
            info!("No property matches '{}'", id_or_slug);
            return Ok(None);
        };

        let images = match self.backend.list_images(&property.id).await {
            Ok(images) => images,
            Err(err) => {
                warn!("Gallery for {} unavailable: {}", property.id, err);
                Vec::new()
            }
        };
        let mut gallery = build_gallery(&self.resolver, &property, &images).await;
        gallery.truncate(DETAIL_GALLERY_LIMIT);

        let price_label = self
            .site
            .price_format
            .format(property.price)
            .unwrap_or_else(|| PRICE_MISSING.to_string());
        let map = map_links(property.coordinates, property.location.as_deref());
        let whatsapp = whatsapp_link(&self.site.whatsapp_number, Some(&property));

        Ok(Some(PropertyDetail {
            property,
            gallery,
            price_label,
            map,
            whatsapp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::backends::MemoryCatalog;
    use crate::models::PropertyImage;

    fn site() -> SiteConfig {
        SiteConfig {
            whatsapp_number: "+91 98123 45678".to_string(),
            price_format: PriceFormat::default(),
            page_cache_ttl: Duration::from_secs(60),
        }
    }

    fn catalog(backend: Arc<dyn CatalogBackend>) -> Catalog {
        Catalog::new(backend, ImageResolver::new(None, Duration::from_secs(60)), site())
    }

    fn property(id: &str, slug: Option<&str>, price: Option<i64>) -> Property {
        Property {
            id: id.to_string(),
            title: format!("Title {}", id),
            tagline: None,
            description: None,
            price,
            location: Some("Seaside".to_string()),
            coordinates: None,
            slug: slug.map(str::to_string),
            main_image: None,
            kind: None,
            bedrooms: None,
            created_at: None,
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CatalogBackend for Unreachable {
        fn source_name(&self) -> &'static str {
            "unreachable"
        }
        async fn list_properties(&self) -> Result<Vec<Property>, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn property_by_id(&self, _: &str) -> Result<Option<Property>, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn property_by_slug(&self, _: &str) -> Result<Option<Property>, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn list_images(&self, _: &str) -> Result<Vec<PropertyImage>, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn cards_label_missing_prices() {
        let backend = MemoryCatalog::with_records(
            vec![property("a", Some("home-a"), None), property("b", None, Some(7_500_000))],
            vec![],
        );
        let cards = catalog(Arc::new(backend))
            .listing_cards(&ListingFilter::default())
            .await;
        let labels: Vec<_> = cards.iter().map(|c| c.price_label.as_str()).collect();
        assert!(labels.contains(&PRICE_ON_REQUEST));
        assert!(labels.contains(&"₹75,00,000"));
        assert!(cards.iter().any(|c| c.href == "/listings/home-a"));
        assert!(cards.iter().any(|c| c.href == "/listings/b"));
        assert!(cards.iter().all(|c| c.image == crate::images::PLACEHOLDER));
    }

    #[tokio::test]
    async fn detail_falls_back_to_id_lookup() {
        let backend = MemoryCatalog::with_records(vec![property("abc", Some("other"), None)], vec![]);
        let detail = catalog(Arc::new(backend)).detail("abc").await.unwrap().unwrap();
        assert_eq!(detail.property.id, "abc");
        assert_eq!(detail.price_label, PRICE_MISSING);
        assert_eq!(detail.gallery.len(), 1);
        assert!(detail.map.is_some());
        assert!(detail.whatsapp.starts_with("https://wa.me/919812345678?text="));
    }

    #[tokio::test]
    async fn detail_gallery_is_capped() {
        let images = (0..9)
            .map(|i| PropertyImage {
                id: format!("i{}", i),
                property_id: "p".to_string(),
                image: format!("/img/{}.jpg", i),
                alt: None,
                caption: None,
                display_order: i,
            })
            .collect();
        let backend = MemoryCatalog::with_records(vec![property("p", None, None)], images);
        let detail = catalog(Arc::new(backend)).detail("p").await.unwrap().unwrap();
        assert_eq!(detail.gallery.len(), DETAIL_GALLERY_LIMIT);
        assert_eq!(detail.gallery[0].src, "/img/0.jpg");
    }

    #[tokio::test]
    async fn missing_property_is_none() {
        let c = catalog(Arc::new(MemoryCatalog::new()));
        assert!(c.detail("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_lists_but_reports_detail() {
        let c = catalog(Arc::new(Unreachable));
        assert!(c.listing_cards(&ListingFilter::default()).await.is_empty());
        let home = c.home().await;
        assert!(home.featured.is_empty());
        assert_eq!(home.gallery, gallery::fallback_gallery());
        assert!(c.detail("x").await.is_err());
    }
}
