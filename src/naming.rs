//! URL slugs and storage object names.
//!
//! Slugs are derived from property titles: lowercase ASCII alphanumerics with
//! every other run of characters collapsed to a single hyphen, and no hyphen at
//! either end. `"Lake View Villa"` → `"lake-view-villa"`.
//!
//! Uploaded images land under `properties/` with a millisecond timestamp and a
//! batch index in front of the sanitized original file name, so two uploads of
//! `IMG_0001.jpg` never collide.

use chrono::{DateTime, Utc};

/// Prefix for every uploaded property image
pub const STORAGE_PREFIX: &str = "properties";

pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(lower);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Slug for a title, or `property-{millis}` when the title has no usable characters
pub fn slug_or_fallback(title: &str, now: DateTime<Utc>) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("property-{}", now.timestamp_millis())
    } else {
        slug
    }
}

/// Whitespace becomes `_`; anything outside `[A-Za-z0-9_.-]` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut out = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for ch in base.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
            out.push(ch);
        }
    }
    if out.trim_matches(['.', '_']).is_empty() {
        "image".to_string()
    } else {
        out
    }
}

/// `properties/{millis}-{index}-{sanitized name}`
pub fn storage_key(file_name: &str, index: usize, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}-{}-{}",
        STORAGE_PREFIX,
        now.timestamp_millis(),
        index,
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn is_well_formed(slug: &str) -> bool {
        !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn simple_title() {
        assert_eq!(slugify("Lake View Villa"), "lake-view-villa");
    }

    #[test]
    fn punctuation_runs_collapse() {
        assert_eq!(slugify("  Skyline 2BHK -- Apartment!! "), "skyline-2bhk-apartment");
        assert_eq!(slugify("Penthouse/Royale (Uptown)"), "penthouse-royale-uptown");
    }

    #[test]
    fn non_ascii_is_a_separator() {
        assert_eq!(slugify("Götgatan 120"), "g-tgatan-120");
        assert_eq!(slugify("₹ Deal"), "deal");
    }

    #[test]
    fn nothing_usable_gives_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!! ---"), "");
    }

    #[test]
    fn slugify_is_idempotent_and_well_formed() {
        let samples = [
            "Lake View Villa",
            "--Seaside--Luxury--Villa--",
            "Green Meadows 3BHK",
            "  ",
            "a",
            "Business Park Office #4",
            "ÅÄÖ åäö",
            "already-a-slug",
            "Mixed_CASE__under_scores",
        ];
        for sample in samples {
            let once = slugify(sample);
            assert_eq!(slugify(&once), once, "not idempotent for {:?}", sample);
            assert!(is_well_formed(&once), "malformed slug {:?} for {:?}", once, sample);
        }
    }

    #[test]
    fn fallback_uses_timestamp() {
        assert_eq!(slug_or_fallback("???", at(1_700_000_000_123)), "property-1700000000123");
        assert_eq!(slug_or_fallback("Urban Studio", at(1)), "urban-studio");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("My Villa  Front.jpg"), "My_Villa_Front.jpg");
        assert_eq!(sanitize_file_name("façade(1).png"), "faade1.png");
        assert_eq!(sanitize_file_name("C:\\photos\\pool.webp"), "pool.webp");
        assert_eq!(sanitize_file_name("???"), "image");
    }

    #[test]
    fn storage_keys_carry_prefix_timestamp_and_index() {
        let now = at(1_700_000_000_000);
        assert_eq!(
            storage_key("front view.jpg", 0, now),
            "properties/1700000000000-0-front_view.jpg"
        );
        assert_ne!(storage_key("a.jpg", 0, now), storage_key("a.jpg", 1, now));
    }
}
