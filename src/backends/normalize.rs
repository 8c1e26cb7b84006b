//! Mapping of raw backend rows/documents onto the canonical records.
//!
//! The table backend and the CMS spell the same concepts differently
//! (`main_image_url` vs `mainImageUrl` vs an `image.asset.url` reference,
//! `slug` vs `slug.current`, `_id` vs `id`). Every adapter passes its JSON
//! through here once, so nothing above the data-access boundary inspects field
//! names.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::{Coordinates, Property, PropertyImage};

const UNTITLED: &str = "Untitled property";

/// `None` when the record has no usable identifier
pub fn normalize_property(raw: &Value) -> Option<Property> {
    let id = first_id(raw, &["id", "_id"])?;
    Some(Property {
        title: first_text(raw, &["title", "name"]).unwrap_or_else(|| UNTITLED.to_string()),
        tagline: first_text(raw, &["tagline"]),
        description: first_text(raw, &["description"]),
        price: first_integer(raw, &["price"]),
        location: first_text(raw, &["location"]),
        coordinates: coordinates(raw),
        slug: slug(raw),
        main_image: first_image_ref(
            raw,
            &["main_image_url", "mainImageUrl", "image_url", "imageUrl", "image"],
        ),
        kind: first_text(raw, &["kind", "type", "property_type"]),
        bedrooms: first_integer(raw, &["bedrooms"]).and_then(|b| u32::try_from(b).ok()),
        created_at: first_timestamp(raw, &["created_at", "_createdAt", "publishedAt"]),
        id,
    })
}

pub fn normalize_properties(rows: &[Value]) -> Vec<Property> {
    rows.iter()
        .filter_map(|row| {
            let property = normalize_property(row);
            if property.is_none() {
                debug!("Skipping property row without id: {}", row);
            }
            property
        })
        .collect()
}

/// Images without a reference are dropped; `position` supplies the order
/// when the row carries none.
pub fn normalize_image(raw: &Value, property_id: &str, position: usize) -> Option<PropertyImage> {
    let image = first_image_ref(raw, &["image_url", "imageUrl", "src", "url", "asset"])?;
    let display_order = first_integer(raw, &["display_order", "order", "displayOrder"])
        .and_then(|o| i32::try_from(o).ok())
        .unwrap_or(position as i32);
    Some(PropertyImage {
        id: first_id(raw, &["id", "_key", "_id"])
            .unwrap_or_else(|| format!("{}-{}", property_id, position)),
        property_id: first_id(raw, &["property_id", "propertyId"])
            .unwrap_or_else(|| property_id.to_string()),
        image,
        alt: first_text(raw, &["alt"]),
        caption: first_text(raw, &["caption"]),
        display_order,
    })
}

/// Stable sort by display order, so equal orders keep their stored sequence
pub fn normalize_images(rows: &[Value], property_id: &str) -> Vec<PropertyImage> {
    let mut images: Vec<PropertyImage> = rows
        .iter()
        .enumerate()
        .filter_map(|(position, row)| normalize_image(row, property_id, position))
        .collect();
    images.sort_by_key(|img| img.display_order);
    images
}

fn field<'a>(raw: &'a Value, names: &[&str]) -> impl Iterator<Item = &'a Value> + 'a {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    names
        .into_iter()
        .filter_map(move |name| raw.get(&name))
        .filter(|v| !v.is_null())
}

fn clean(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn first_text(raw: &Value, names: &[&str]) -> Option<String> {
    field(raw, names).find_map(|v| v.as_str().and_then(clean))
}

fn first_id(raw: &Value, names: &[&str]) -> Option<String> {
    field(raw, names).find_map(|v| match v {
        Value::String(s) => clean(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_integer(raw: &Value, names: &[&str]) -> Option<i64> {
    field(raw, names).find_map(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

fn first_timestamp(raw: &Value, names: &[&str]) -> Option<DateTime<Utc>> {
    field(raw, names).find_map(|v| {
        v.as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Plain string, `{url}`, `{asset: {url}}` or `{asset: {_ref}}`
fn first_image_ref(raw: &Value, names: &[&str]) -> Option<String> {
    field(raw, names).find_map(image_ref)
}

fn image_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Object(_) => value
            .get("url")
            .and_then(Value::as_str)
            .and_then(clean)
            .or_else(|| value.get("asset").and_then(image_ref))
            .or_else(|| value.get("_ref").and_then(Value::as_str).and_then(clean)),
        _ => None,
    }
}

fn slug(raw: &Value) -> Option<String> {
    field(raw, &["slug"]).find_map(|v| match v {
        Value::String(s) => clean(s),
        Value::Object(_) => v.get("current").and_then(Value::as_str).and_then(clean),
        _ => None,
    })
}

fn coordinates(raw: &Value) -> Option<Coordinates> {
    let from_pair = |v: &Value| {
        let lat = number(v, &["lat", "latitude"])?;
        let lng = number(v, &["lng", "lon", "longitude"])?;
        Some(Coordinates { lat, lng })
    };
    field(raw, &["coordinates", "geo", "location_coordinates"])
        .find_map(&from_pair)
        .or_else(|| from_pair(raw))
}

fn number(raw: &Value, names: &[&str]) -> Option<f64> {
    field(raw, names).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_row() {
        let row = json!({
            "id": "7f9c",
            "title": " Lake View Villa ",
            "tagline": "",
            "description": "Quiet lakeside home",
            "price": 25000000,
            "location": "Seaside",
            "main_image_url": "properties/1-0-front.jpg",
            "slug": "lake-view-villa",
            "coordinates": {"lat": 19.1, "lng": 72.8},
            "created_at": "2025-03-01T10:00:00+00:00"
        });
        let p = normalize_property(&row).unwrap();
        assert_eq!(p.id, "7f9c");
        assert_eq!(p.title, "Lake View Villa");
        assert_eq!(p.tagline, None);
        assert_eq!(p.price, Some(25_000_000));
        assert_eq!(p.main_image.as_deref(), Some("properties/1-0-front.jpg"));
        assert_eq!(p.slug.as_deref(), Some("lake-view-villa"));
        assert_eq!(p.coordinates, Some(Coordinates { lat: 19.1, lng: 72.8 }));
        assert!(p.created_at.is_some());
    }

    #[test]
    fn cms_document() {
        let doc = json!({
            "_id": "drafts.abc",
            "title": "Urban Studio",
            "slug": {"_type": "slug", "current": "urban-studio"},
            "image": {"asset": {"_id": "image-1", "url": "https://cdn.sanity.io/images/x/y/1.jpg"}},
            "coordinates": {"_type": "geopoint", "lat": 18.5, "lng": 73.8},
            "type": "Studio",
            "bedrooms": 1,
            "price": 3200000.0,
            "_createdAt": "2025-01-02T03:04:05Z"
        });
        let p = normalize_property(&doc).unwrap();
        assert_eq!(p.id, "drafts.abc");
        assert_eq!(p.slug.as_deref(), Some("urban-studio"));
        assert_eq!(
            p.main_image.as_deref(),
            Some("https://cdn.sanity.io/images/x/y/1.jpg")
        );
        assert_eq!(p.kind.as_deref(), Some("Studio"));
        assert_eq!(p.bedrooms, Some(1));
        assert_eq!(p.price, Some(3_200_000));
    }

    #[test]
    fn camel_case_projection() {
        let doc = json!({"_id": "p9", "title": "Office", "mainImageUrl": "/properties/p4/1.jpg"});
        let p = normalize_property(&doc).unwrap();
        assert_eq!(p.main_image.as_deref(), Some("/properties/p4/1.jpg"));
    }

    #[test]
    fn null_literals_are_missing() {
        let row = json!({"id": 12, "title": null, "main_image_url": "null", "location": "undefined"});
        let p = normalize_property(&row).unwrap();
        assert_eq!(p.id, "12");
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.main_image, None);
        assert_eq!(p.location, None);
    }

    #[test]
    fn rows_without_id_are_skipped() {
        let rows = vec![json!({"title": "Ghost"}), json!({"id": "a", "title": "Real"})];
        let props = normalize_properties(&rows);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].id, "a");
    }

    #[test]
    fn image_rows_sorted_by_order() {
        let rows = vec![
            json!({"id": "i3", "property_id": "p", "image_url": "c.jpg", "display_order": 2}),
            json!({"id": "i1", "property_id": "p", "image_url": "a.jpg", "display_order": 0}),
            json!({"id": "i2", "property_id": "p", "image_url": "b.jpg", "display_order": 1}),
            json!({"id": "i4", "property_id": "p", "image_url": null, "display_order": 3}),
        ];
        let images = normalize_images(&rows, "p");
        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i2", "i3"]);
    }

    #[test]
    fn cms_gallery_entries_use_position() {
        let rows = vec![
            json!({"_key": "k1", "asset": {"url": "https://cdn/1.jpg"}, "alt": "Pool", "caption": "Pool at dusk"}),
            json!({"_key": "k2", "asset": {"url": "https://cdn/2.jpg"}}),
        ];
        let images = normalize_images(&rows, "doc1");
        assert_eq!(images[0].id, "k1");
        assert_eq!(images[0].property_id, "doc1");
        assert_eq!(images[0].display_order, 0);
        assert_eq!(images[0].caption.as_deref(), Some("Pool at dusk"));
        assert_eq!(images[1].display_order, 1);
    }
}
