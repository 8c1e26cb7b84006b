use std::collections::HashSet;

use futures::future::join_all;

use crate::images::{ImageResolver, PLACEHOLDER};
use crate::models::{GalleryItem, Property, PropertyImage};

const DEFAULT_ALT: &str = "Property image";

/// Home gallery never grows past this
pub const HOME_GALLERY_LIMIT: usize = 24;

/// Items shown on a detail page
pub const DETAIL_GALLERY_LIMIT: usize = 6;

fn alt_text(alt: Option<&str>, title: &str) -> String {
    alt.map(str::trim)
        .filter(|a| !a.is_empty())
        .or_else(|| Some(title.trim()).filter(|t| !t.is_empty()))
        .unwrap_or(DEFAULT_ALT)
        .to_string()
}

/// Gallery for one property: its images in order, else the main image, else a placeholder.
pub async fn build_gallery(
    resolver: &ImageResolver,
    property: &Property,
    images: &[PropertyImage],
) -> Vec<GalleryItem> {
    if !images.is_empty() {
        let mut ordered: Vec<&PropertyImage> = images.iter().collect();
        ordered.sort_by_key(|img| img.display_order);
        let sources = join_all(
            ordered
                .iter()
                .map(|img| resolver.resolve_or_placeholder(Some(&img.image))),
        )
        .await;
        return ordered
            .into_iter()
            .zip(sources)
            .map(|(img, src)| GalleryItem {
                src,
                alt: alt_text(img.alt.as_deref(), &property.title),
                caption: img.caption.clone(),
                href: None,
            })
            .collect();
    }

    let src = resolver
        .resolve_or_placeholder(property.main_image.as_deref())
        .await;
    vec![GalleryItem {
        src,
        alt: alt_text(None, &property.title),
        caption: None,
        href: None,
    }]
}

/// Keep the first item for each `src`, preserving order
pub fn dedupe_by_src(items: Vec<GalleryItem>) -> Vec<GalleryItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.src.clone()))
        .collect()
}

/// One item per property, linking to its detail page
pub async fn home_gallery(resolver: &ImageResolver, properties: &[Property]) -> Vec<GalleryItem> {
    let sources = join_all(
        properties
            .iter()
            .map(|p| resolver.resolve_or_placeholder(p.main_image.as_deref())),
    )
    .await;
    let items: Vec<GalleryItem> = properties
        .iter()
        .zip(sources)
        .map(|(p, src)| GalleryItem {
            src,
            alt: alt_text(None, &p.title),
            caption: Some(p.title.clone()),
            href: Some(format!("/listings/{}", p.route_key())),
        })
        .collect();

    let mut items = dedupe_by_src(items);
    items.truncate(HOME_GALLERY_LIMIT);
    if items.is_empty() {
        return fallback_gallery();
    }
    items
}

/// Bundled pictures shown while the catalog is empty or unreachable
pub fn fallback_gallery() -> Vec<GalleryItem> {
    [
        ("/static/gallery/1.svg", "Modern living room"),
        ("/static/gallery/2.svg", "Open kitchen"),
        ("/static/gallery/3.svg", "Rooftop view"),
    ]
    .into_iter()
    .map(|(src, alt)| GalleryItem {
        src: src.to_string(),
        alt: alt.to_string(),
        caption: None,
        href: Some("/listings".to_string()),
    })
    .collect()
}

pub fn is_placeholder(item: &GalleryItem) -> bool {
    item.src == PLACEHOLDER
}
