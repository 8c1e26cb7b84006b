//! Display formatting for listing data: prices, map links and WhatsApp enquiries.

use crate::models::{Coordinates, Property};

/// Digit grouping convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceLocale {
    /// 1,23,45,678 (lakh/crore grouping)
    EnIn,
    /// 12,345,678
    EnUs,
}

impl PriceLocale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en-in" | "in" => Some(Self::EnIn),
            "en-us" | "us" | "en" => Some(Self::EnUs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceFormat {
    pub locale: PriceLocale,
    pub currency_symbol: String,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self {
            locale: PriceLocale::EnIn,
            currency_symbol: "₹".to_string(),
        }
    }
}

impl PriceFormat {
    /// `None` when the price is missing; callers pick their own fallback text
    pub fn format(&self, price: Option<i64>) -> Option<String> {
        let price = price?;
        let digits = price.unsigned_abs().to_string();
        let grouped = match self.locale {
            PriceLocale::EnIn => group_indian(&digits),
            PriceLocale::EnUs => group_thousands(&digits),
        };
        let sign = if price < 0 { "-" } else { "" };
        Some(format!("{}{}{}", sign, self.currency_symbol, grouped))
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// Last three digits form one group, everything before is grouped in pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(tail);
    out
}

/// Embed and outbound links for the property map
#[derive(Debug, Clone, PartialEq)]
pub struct MapLinks {
    pub embed: String,
    pub link: String,
}

/// Coordinates win over the free-text location; neither gives `None`.
pub fn map_links(coordinates: Option<Coordinates>, location: Option<&str>) -> Option<MapLinks> {
    if let Some(Coordinates { lat, lng }) = coordinates {
        let q = format!(
            "{},{}",
            urlencoding::encode(&lat.to_string()),
            urlencoding::encode(&lng.to_string())
        );
        return Some(MapLinks {
            embed: format!("https://www.google.com/maps?q={}&z=15&output=embed", q),
            link: format!("https://www.google.com/maps?q={}&z=15", q),
        });
    }
    let location = location.map(str::trim).filter(|l| !l.is_empty())?;
    let q = urlencoding::encode(location);
    Some(MapLinks {
        embed: format!("https://www.google.com/maps?q={}&z=13&output=embed", q),
        link: format!("https://www.google.com/maps?q={}&z=13", q),
    })
}

/// `wa.me` deep link with a prefilled enquiry about the property
pub fn whatsapp_link(number: &str, property: Option<&Property>) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    let text = match property {
        Some(p) => {
            let location = p
                .location
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| format!(" located at {}", l))
                .unwrap_or_default();
            format!(
                "Hi, I'm interested in \"{}\"{}. Please share details.",
                p.title, location
            )
        }
        None => "Hi, I'd like to know more about your properties.".to_string(),
    };
    format!("https://wa.me/{}?text={}", digits, urlencoding::encode(&text))
}
