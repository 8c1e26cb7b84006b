//! Estate Showcase: a server-rendered real-estate listings site.
//!
//! * [`catalog`] builds listing cards, detail views and galleries from a
//!   [`backends::CatalogBackend`] (Supabase, Sanity or in-memory).
//! * [`images`] turns stored image references into loadable URLs.
//! * [`admin`] runs the create/edit/upload/reorder workflow.
//! * [`leads`] validates and relays contact messages and callback requests.
//! * [`web`] wires it all into an axum router; [`render`] holds the maud views.

pub mod admin;
pub mod backends;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod images;
pub mod leads;
pub mod models;
pub mod naming;
pub mod render;
pub mod web;

pub use config::Config;
pub use web::{router, AppState};
