//! HTTP surface: public pages, the admin area and the JSON endpoints.

pub mod admin;
pub mod api;
pub mod pages;
pub mod session;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::admin::AdminService;
use crate::backends::{AuthProvider, Backends, MemoryStorage};
use crate::cache::PageCache;
use crate::catalog::Catalog;
use crate::config::{AccessConfig, Config};
use crate::images::ImageResolver;
use crate::leads::{LeadRelay, RateLimiter};

/// Directory served under `/static`, relative to the working directory
pub const STATIC_DIR: &str = "static";

/// Multipart bodies carry several photos at once
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Everything a handler needs, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub admin: AdminService,
    pub leads: LeadRelay,
    pub cache: PageCache,
    pub limiter: Arc<RateLimiter>,
    pub auth: Arc<dyn AuthProvider>,
    pub media: Option<Arc<MemoryStorage>>,
    pub access: Arc<AccessConfig>,
}

impl AppState {
    pub fn from_config(config: &Config, backends: Backends) -> Self {
        Self::with_leads(config, backends, LeadRelay::from_config(&config.mail))
    }

    /// Same as [`AppState::from_config`] with an explicit lead relay
    pub fn with_leads(config: &Config, backends: Backends, leads: LeadRelay) -> Self {
        let resolver = ImageResolver::new(backends.storage.clone(), config.storage.signed_url_ttl);
        Self {
            catalog: Catalog::new(backends.catalog.clone(), resolver, config.site.clone()),
            admin: AdminService::new(backends.catalog, backends.storage),
            leads,
            cache: PageCache::new(config.site.page_cache_ttl),
            limiter: Arc::new(RateLimiter::default()),
            auth: backends.auth,
            media: backends.media,
            access: Arc::new(config.access.clone()),
        }
    }

    pub fn whatsapp_number(&self) -> &str {
        &self.catalog.site().whatsapp_number
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/login", get(admin::login_form).post(admin::login))
        .route("/admin/logout", post(admin::logout))
        .route(
            "/admin/properties",
            get(admin::list_properties).post(admin::create_property),
        )
        .route(
            "/admin/properties/{id}",
            get(admin::edit_property).post(admin::update_property),
        )
        .route("/admin/properties/{id}/images/order", post(admin::save_order))
        .route("/admin/properties/{id}/main", post(admin::set_main))
        .route(
            "/admin/properties/{id}/delete",
            get(admin::confirm_delete_property).post(admin::delete_property),
        )
        .route(
            "/admin/images/{image_id}/delete",
            get(admin::confirm_delete_image).post(admin::delete_image),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let api = Router::new()
        .route("/api/contact", post(api::contact))
        .route("/api/callback", post(api::callback))
        .route("/api/revalidate", post(api::revalidate))
        .route("/api/admin/properties/{id}/images/order", put(api::reorder));

    Router::new()
        .route("/", get(pages::home))
        .route("/listings", get(pages::listings))
        .route("/listings/{key}", get(pages::detail))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact_form).post(pages::contact))
        .route("/callback", post(pages::callback))
        .route("/media/{*key}", get(pages::media))
        .merge(admin)
        .merge(api)
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(pages::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Client identity for rate limiting: first forwarded address, else "unknown"
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded
        .or(real_ip)
        .unwrap_or("unknown")
        .to_string()
}
