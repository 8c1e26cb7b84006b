//! Environment-driven configuration.
//!
//! Every setting comes from a process environment variable (optionally seeded
//! from a `.env` file). Unset or blank variables fall back to typed defaults;
//! only the credentials of the selected catalog backend are mandatory.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::catalog::format::{PriceFormat, PriceLocale};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_WHATSAPP_NUMBER: &str = "+919812345678";
const DEFAULT_SANITY_DATASET: &str = "production";
const DEFAULT_SANITY_API_VERSION: &str = "2025-01-01";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60;
const DEFAULT_PAGE_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Which catalog adapter serves listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    Sanity,
    Memory,
}

impl BackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(Self::Supabase),
            "sanity" => Some(Self::Sanity),
            "memory" | "demo" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Privileged key; enables signed storage URLs
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    Supabase(SupabaseConfig),
    Sanity(SanityConfig),
    Memory,
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Supabase(_) => BackendKind::Supabase,
            Self::Sanity(_) => BackendKind::Sanity,
            Self::Memory => BackendKind::Memory,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Bucket holding uploaded images; uploads refuse to run without it
    pub bucket: Option<String>,
    pub signed_url_ttl: Duration,
}

/// SMTP settings as read; completeness is checked when a message is sent
#[derive(Debug, Clone, PartialEq)]
pub struct MailConfig {
    pub enabled: bool,
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessConfig {
    pub revalidate_secret: Option<String>,
    /// Lower-cased; empty means any authenticated user is an admin
    pub admin_emails: Vec<String>,
    pub demo_admin_email: Option<String>,
    pub demo_admin_password: Option<String>,
}

impl AccessConfig {
    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        if self.admin_emails.is_empty() {
            return true;
        }
        match email {
            Some(email) => {
                let email = email.trim().to_ascii_lowercase();
                self.admin_emails.iter().any(|allowed| *allowed == email)
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub whatsapp_number: String,
    pub price_format: PriceFormat,
    pub page_cache_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub access: AccessConfig,
    pub site: SiteConfig,
}

impl Config {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!("Ignoring unreadable .env file: {}", err);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = read_backend(&get)?;

        let storage = StorageConfig {
            bucket: get("STORAGE_BUCKET"),
            signed_url_ttl: Duration::from_secs(parse_or(
                &get,
                "SIGNED_URL_TTL_SECS",
                DEFAULT_SIGNED_URL_TTL_SECS,
            )),
        };

        let mail = MailConfig {
            enabled: parse_bool_or(&get, "EMAIL_ENABLED", true),
            host: get("SMTP_HOST"),
            port: parse_or(&get, "SMTP_PORT", DEFAULT_SMTP_PORT),
            user: get("SMTP_USER"),
            password: get("SMTP_PASS"),
            to: get("CONTACT_TO_EMAIL"),
        };

        let access = AccessConfig {
            revalidate_secret: get("REVALIDATE_SECRET"),
            admin_emails: get("ADMIN_EMAILS")
                .map(|raw| {
                    raw.split(',')
                        .map(|e| e.trim().to_ascii_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            demo_admin_email: get("DEMO_ADMIN_EMAIL"),
            demo_admin_password: get("DEMO_ADMIN_PASSWORD"),
        };

        let locale = match get("PRICE_LOCALE") {
            Some(raw) => PriceLocale::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "PRICE_LOCALE",
                reason: format!("unsupported locale '{}'", raw),
            })?,
            None => PriceLocale::EnIn,
        };
        let site = SiteConfig {
            whatsapp_number: get("WHATSAPP_NUMBER")
                .unwrap_or_else(|| DEFAULT_WHATSAPP_NUMBER.to_string()),
            price_format: PriceFormat {
                locale,
                currency_symbol: get("CURRENCY_SYMBOL").unwrap_or_else(|| "₹".to_string()),
            },
            page_cache_ttl: Duration::from_secs(parse_or(
                &get,
                "PAGE_CACHE_TTL_SECS",
                DEFAULT_PAGE_CACHE_TTL_SECS,
            )),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            backend,
            storage,
            mail,
            access,
            site,
        })
    }
}

fn read_backend<G>(get: &G) -> Result<BackendConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let kind = match get("CATALOG_BACKEND") {
        Some(raw) => BackendKind::parse(&raw).ok_or_else(|| ConfigError::Invalid {
            var: "CATALOG_BACKEND",
            reason: format!("expected supabase, sanity or memory, got '{}'", raw),
        })?,
        None if get("SUPABASE_URL").is_some() => BackendKind::Supabase,
        None if get("SANITY_PROJECT_ID").is_some() => BackendKind::Sanity,
        None => BackendKind::Memory,
    };

    Ok(match kind {
        BackendKind::Supabase => BackendConfig::Supabase(SupabaseConfig {
            url: get("SUPABASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .ok_or(ConfigError::Missing("SUPABASE_URL"))?,
            anon_key: get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
        }),
        BackendKind::Sanity => BackendConfig::Sanity(SanityConfig {
            project_id: get("SANITY_PROJECT_ID").ok_or(ConfigError::Missing("SANITY_PROJECT_ID"))?,
            dataset: get("SANITY_DATASET").unwrap_or_else(|| DEFAULT_SANITY_DATASET.to_string()),
            api_version: get("SANITY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SANITY_API_VERSION.to_string()),
            use_cdn: parse_bool_or(get, "SANITY_USE_CDN", false),
        }),
        BackendKind::Memory => BackendConfig::Memory,
    })
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> T
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{}='{}' is not valid, using default {}", name, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_bool_or<G>(get: &G, name: &'static str, default: bool) -> bool
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!("{}='{}' is not a boolean, using default {}", name, v, default);
            default
        }
        None => default,
    }
}
