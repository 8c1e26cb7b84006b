use maud::{html, Markup, DOCTYPE};

use crate::models::{Property, PropertyImage};
use crate::render::{notice, SITE_NAME};

/// Row of the admin property table
#[derive(Debug, Clone, PartialEq)]
pub struct AdminListing {
    pub property: Property,
    pub thumbnail: String,
    pub price_label: String,
}

/// Gallery image on the edit page, with its resolved URL
#[derive(Debug, Clone, PartialEq)]
pub struct AdminImage {
    pub image: PropertyImage,
    pub src: String,
    pub is_main: bool,
}

/// Whether uploads can run, shown as a panel on the admin pages
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Ready { bucket: String },
    MissingBucket,
}

/// Confirmation messages carried in the `done` query flag after a redirect
pub fn flash_message(flag: &str) -> Option<&'static str> {
    match flag {
        "created" => Some("Property created"),
        "updated" => Some("Property updated"),
        "deleted" => Some("Property deleted"),
        "order-saved" => Some("Image order saved"),
        "main-set" => Some("Main image set"),
        "image-deleted" => Some("Image deleted"),
        _ => None,
    }
}

fn admin_document(title: &str, user_email: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " · " (SITE_NAME) " admin" }
                link rel="stylesheet" href="/static/site.css";
            }
            body.admin {
                nav.navbar {
                    a.brand href="/admin/properties" { (SITE_NAME) " admin" }
                    div.nav-links {
                        a href="/admin/properties" { "Properties" }
                        a href="/" target="_blank" { "View site" }
                    }
                    @if let Some(email) = user_email {
                        form.nav-actions method="post" action="/admin/logout" {
                            span.muted { (email) }
                            button.secondary type="submit" { "Log out" }
                        }
                    }
                }
                main.container { (content) }
            }
        }
    }
}

pub fn login_page(email: &str, error: Option<&str>) -> Markup {
    let content = html! {
        section.login {
            h1 { "Admin login" }
            @if let Some(error) = error {
                (notice("error", error))
            }
            form method="post" action="/admin/login" {
                label {
                    "Email"
                    input type="email" name="email" required autocomplete="username" value=(email);
                }
                label {
                    "Password"
                    input type="password" name="password" required autocomplete="current-password";
                }
                button type="submit" { "Sign in" }
            }
        }
    };
    admin_document("Login", None, content)
}

pub fn missing_config_panel(status: &UploadStatus) -> Markup {
    match status {
        UploadStatus::Ready { .. } => html! {},
        UploadStatus::MissingBucket => html! {
            div.panel.warning {
                h2 { "Missing configuration" }
                p {
                    "Image uploads are disabled because no storage bucket is configured. "
                    "Set " code { "STORAGE_BUCKET" } " (and the storage credentials for your backend) "
                    "and restart the server. Properties without images can still be created."
                }
            }
        },
    }
}

fn field_value(property: Option<&Property>, f: impl Fn(&Property) -> Option<String>) -> String {
    property.and_then(f).unwrap_or_default()
}

fn property_fields(property: Option<&Property>) -> Markup {
    html! {
        label {
            "Title"
            input type="text" name="title" required value=(property.map(|p| p.title.as_str()).unwrap_or(""));
        }
        label {
            "Tagline"
            input type="text" name="tagline" value=(field_value(property, |p| p.tagline.clone()));
        }
        label {
            "Description"
            textarea name="description" rows="5" { (field_value(property, |p| p.description.clone())) }
        }
        div.row {
            label {
                "Location"
                input type="text" name="location" value=(field_value(property, |p| p.location.clone()));
            }
            label {
                "Price"
                input type="number" name="price" min="0" value=(field_value(property, |p| p.price.map(|v| v.to_string())));
            }
        }
        div.row {
            label {
                "Type"
                input type="text" name="kind" list="kinds" value=(field_value(property, |p| p.kind.clone()));
                datalist id="kinds" {
                    option value="Apartment" {}
                    option value="Villa" {}
                    option value="Office" {}
                    option value="Studio" {}
                }
            }
            label {
                "Bedrooms"
                input type="number" name="bedrooms" min="0" value=(field_value(property, |p| p.bedrooms.map(|v| v.to_string())));
            }
        }
        div.row {
            label {
                "Latitude"
                input type="text" name="lat" value=(field_value(property, |p| p.coordinates.map(|c| c.lat.to_string())));
            }
            label {
                "Longitude"
                input type="text" name="lng" value=(field_value(property, |p| p.coordinates.map(|c| c.lng.to_string())));
            }
        }
    }
}

fn upload_input(status: &UploadStatus) -> Markup {
    html! {
        label {
            "Images"
            @match status {
                UploadStatus::Ready { .. } => {
                    input type="file" name="images" accept="image/*" multiple;
                }
                UploadStatus::MissingBucket => {
                    input type="file" name="images" disabled;
                }
            }
        }
    }
}

pub fn properties_page(
    user_email: Option<&str>,
    listings: &[AdminListing],
    uploads: &UploadStatus,
    flash: Option<&str>,
    error: Option<&str>,
) -> Markup {
    let content = html! {
        h1 { "Properties" }
        @if let Some(flash) = flash { (notice("success", flash)) }
        @if let Some(error) = error { (notice("error", error)) }
        (missing_config_panel(uploads))
        section.panel {
            h2 { "Add property" }
            form method="post" action="/admin/properties" enctype="multipart/form-data" {
                (property_fields(None))
                (upload_input(uploads))
                p.muted { "The first image becomes the main image." }
                button type="submit" { "Create property" }
            }
        }
        section {
            h2 { "All properties (" (listings.len()) ")" }
            @if listings.is_empty() {
                p.empty { "No properties yet." }
            } @else {
                table.admin-table {
                    thead {
                        tr { th { "Image" } th { "Title" } th { "Location" } th { "Price" } th { "Slug" } th {} }
                    }
                    tbody {
                        @for row in listings {
                            @let p = &row.property;
                            tr {
                                td { img.thumb src=(row.thumbnail) alt=(p.title); }
                                td { a href={ "/admin/properties/" (p.id) } { (p.title) } }
                                td { (p.location.as_deref().unwrap_or("—")) }
                                td { (row.price_label) }
                                td { code { (p.route_key()) } }
                                td.actions {
                                    a href={ "/admin/properties/" (p.id) } { "Edit" }
                                    " "
                                    a.danger href={ "/admin/properties/" (p.id) "/delete" } { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    admin_document("Properties", user_email, content)
}

pub fn edit_page(
    user_email: Option<&str>,
    property: &Property,
    images: &[AdminImage],
    uploads: &UploadStatus,
    flash: Option<&str>,
    error: Option<&str>,
) -> Markup {
    let base = format!("/admin/properties/{}", property.id);
    let content = html! {
        p { a href="/admin/properties" { "← All properties" } }
        h1 { "Edit " (property.title) }
        @if let Some(flash) = flash { (notice("success", flash)) }
        @if let Some(error) = error { (notice("error", error)) }
        (missing_config_panel(uploads))
        section.panel {
            form method="post" action=(base) enctype="multipart/form-data" {
                (property_fields(Some(property)))
                label {
                    "Slug"
                    input type="text" name="slug" value=(property.slug.as_deref().unwrap_or(""));
                }
                (upload_input(uploads))
                p.muted { "New images are added after the existing ones." }
                button type="submit" { "Save changes" }
            }
        }
        section.panel {
            h2 { "Images (" (images.len()) ")" }
            @if images.is_empty() {
                p.empty { "No gallery images." }
            } @else {
                form #image-order method="post" action={ (base) "/images/order" } {}
                div.image-grid {
                    @for (index, img) in images.iter().enumerate() {
                        figure.admin-image {
                            img src=(img.src) alt=(img.image.alt.as_deref().unwrap_or(&property.title));
                            figcaption {
                                label {
                                    "Position "
                                    input type="number" form="image-order" name=(img.image.id)
                                        min="1" value=(index + 1);
                                }
                                @if img.is_main {
                                    span.badge { "Main" }
                                } @else {
                                    form method="post" action={ (base) "/main" } {
                                        input type="hidden" name="image_id" value=(img.image.id);
                                        button.secondary type="submit" { "Set as main" }
                                    }
                                }
                                a.danger href={ "/admin/images/" (img.image.id) "/delete?property_id=" (property.id) } {
                                    "Delete"
                                }
                            }
                        }
                    }
                }
                button type="submit" form="image-order" { "Save order" }
            }
        }
        p {
            a.button.danger href={ (base) "/delete" } { "Delete property" }
        }
    };
    admin_document(&property.title, user_email, content)
}

pub fn message_page(user_email: Option<&str>, title: &str, message: &str) -> Markup {
    let content = html! {
        section.panel {
            h1 { (title) }
            p { (message) }
            a.button href="/admin/properties" { "Back to properties" }
        }
    };
    admin_document(title, user_email, content)
}

/// Irreversible action behind a POST form
pub fn confirm_page(
    user_email: Option<&str>,
    title: &str,
    message: &str,
    action: &str,
    cancel: &str,
) -> Markup {
    let content = html! {
        section.panel.confirm {
            h1 { (title) }
            p { (message) }
            p.muted { "This cannot be undone." }
            form method="post" action=(action) {
                a.button.secondary href=(cancel) { "Cancel" }
                " "
                button.danger type="submit" { "Delete" }
            }
        }
    };
    admin_document(title, user_email, content)
}
