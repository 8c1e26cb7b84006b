use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Property;

/// Listing filters, read from the `/listings` query string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Property kind (Apartment, Villa, ...); case-insensitive, "all" matches everything
    #[serde(default, deserialize_with = "blank_as_none")]
    pub kind: Option<String>,
    /// Minimum number of bedrooms
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub min_bedrooms: Option<u32>,
    /// Minimum price, whole currency units
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub min_price: Option<i64>,
    /// Maximum price, whole currency units
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub max_price: Option<i64>,
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.min_bedrooms.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Properties without a price count as 0; without bedrooms as 0.
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(kind) = self.kind.as_deref() {
            if !kind.eq_ignore_ascii_case("all") {
                let matches_kind = property
                    .kind
                    .as_deref()
                    .is_some_and(|k| k.eq_ignore_ascii_case(kind));
                if !matches_kind {
                    return false;
                }
            }
        }
        let price = property.price.unwrap_or(0);
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        let bedrooms = property.bedrooms.unwrap_or(0);
        !self.min_bedrooms.is_some_and(|min| bedrooms < min)
    }

    pub fn apply(&self, properties: Vec<Property>) -> Vec<Property> {
        if self.is_empty() {
            return properties;
        }
        properties.into_iter().filter(|p| self.matches(p)).collect()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

// Unparseable numbers are ignored rather than rejecting the whole page.
fn blank_as_none_parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
{
    let raw = blank_as_none(deserializer)?;
    Ok(raw.and_then(|s| s.replace(',', "").parse().ok()))
}
