//! HTML rendering with maud.
//!
//! Every page goes through [`base_document`], which adds the navbar, the
//! footer and the callback dialog. The dialog's visibility is plain page
//! state: handlers read it from the `callback` query flag and pass it down in
//! [`PageContext`].

pub mod admin;
pub mod listings;
pub mod pages;

use maud::{html, Markup, DOCTYPE};

use crate::models::CallbackRequest;

pub const SITE_NAME: &str = "Estate Showcase";

/// State of the "book a callback" dialog
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CallbackState {
    #[default]
    Closed,
    Open {
        error: Option<String>,
        form: CallbackRequest,
    },
    Sent,
}

impl CallbackState {
    /// From the `callback` query flag: `open` shows the form, `sent` the confirmation
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("open") => Self::Open {
                error: None,
                form: CallbackRequest::default(),
            },
            Some("sent") => Self::Sent,
            _ => Self::Closed,
        }
    }
}

/// Per-request values shared by every page
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    /// Path of the page being rendered, without query
    pub path: String,
    pub whatsapp_link: String,
    pub callback: CallbackState,
}

impl PageContext {
    pub fn new(path: impl Into<String>, whatsapp_link: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            whatsapp_link: whatsapp_link.into(),
            callback: CallbackState::Closed,
        }
    }

    pub fn with_callback(mut self, callback: CallbackState) -> Self {
        self.callback = callback;
        self
    }
}

pub fn base_document(title: &str, ctx: &PageContext, content: Markup) -> Markup {
    let full_title = if title.is_empty() {
        SITE_NAME.to_string()
    } else {
        format!("{} · {}", title, SITE_NAME)
    };
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (full_title) }
                link rel="stylesheet" href="/static/site.css";
            }
            body {
                (navbar(ctx))
                main.container { (content) }
                (footer(ctx))
                (callback_dialog(ctx))
            }
        }
    }
}

fn nav_link(href: &str, label: &str, current: &str) -> Markup {
    let is_current = current == href || (href != "/" && current.starts_with(&format!("{}/", href)));
    html! {
        a href=(href) class=[is_current.then_some("current")] { (label) }
    }
}

pub fn navbar(ctx: &PageContext) -> Markup {
    html! {
        nav.navbar {
            a.brand href="/" { (SITE_NAME) }
            div.nav-links {
                (nav_link("/listings", "Listings", &ctx.path))
                (nav_link("/about", "About", &ctx.path))
                (nav_link("/contact", "Contact", &ctx.path))
            }
            div.nav-actions {
                a.button.secondary href={ (ctx.path) "?callback=open" } { "Request callback" }
                a.button.whatsapp href=(ctx.whatsapp_link) target="_blank" rel="noopener noreferrer" {
                    "Chat on WhatsApp"
                }
            }
        }
    }
}

pub fn footer(ctx: &PageContext) -> Markup {
    html! {
        footer.site-footer {
            p { "© " (SITE_NAME) ". Homes, villas and offices." }
            p {
                a href="/contact" { "Contact us" }
                " · "
                a href={ (ctx.path) "?callback=open" } { "Book a callback" }
                " · "
                a href="/admin/properties" { "Admin" }
            }
        }
    }
}

pub fn callback_dialog(ctx: &PageContext) -> Markup {
    match &ctx.callback {
        CallbackState::Closed => html! {},
        CallbackState::Sent => html! {
            dialog.callback open {
                h2 { "Request received" }
                p { "We'll call you back shortly." }
                a.button href=(ctx.path) { "Close" }
            }
        },
        CallbackState::Open { error, form } => html! {
            dialog.callback open {
                h2 { "Book a callback" }
                @if let Some(error) = error {
                    p.error role="alert" { (error) }
                }
                form method="post" action="/callback" {
                    input type="hidden" name="return_to" value=(ctx.path);
                    label {
                        "Name"
                        input type="text" name="name" required value=(form.name);
                    }
                    label {
                        "Phone"
                        input type="tel" name="phone" required value=(form.phone);
                    }
                    label {
                        "Notes"
                        textarea name="notes" { (form.notes.as_deref().unwrap_or("")) }
                    }
                    div.actions {
                        a.button.secondary href=(ctx.path) { "Cancel" }
                        button type="submit" { "Request callback" }
                    }
                }
            }
        },
    }
}

/// Short flash message shown above page content
pub fn notice(kind: &str, message: &str) -> Markup {
    html! {
        div class={ "notice " (kind) } role="status" { (message) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str) -> PageContext {
        PageContext::new(path, "https://wa.me/919812345678?text=hi")
    }

    #[test]
    fn document_has_doctype_and_title() {
        let doc = base_document("About", &ctx("/about"), html! { p { "x" } }).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>About · Estate Showcase</title>"));
    }

    #[test]
    fn navbar_marks_current_section() {
        let nav = navbar(&ctx("/listings/urban-studio")).into_string();
        assert!(nav.contains(r#"<a href="/listings" class="current">"#));
        assert!(nav.contains("/listings/urban-studio?callback=open"));
        assert!(nav.contains("https://wa.me/919812345678"));
    }

    #[test]
    fn dialog_follows_state() {
        assert_eq!(callback_dialog(&ctx("/")).into_string(), "");
        let open = ctx("/about").with_callback(CallbackState::from_flag(Some("open")));
        let html = callback_dialog(&open).into_string();
        assert!(html.contains("<dialog") && html.contains(" open>"));
        assert!(html.contains(r#"name="return_to" value="/about""#));
        let sent = ctx("/").with_callback(CallbackState::from_flag(Some("sent")));
        assert!(callback_dialog(&sent).into_string().contains("Request received"));
        assert_eq!(CallbackState::from_flag(Some("bogus")), CallbackState::Closed);
    }

    #[test]
    fn dialog_shows_error_and_keeps_input() {
        let state = CallbackState::Open {
            error: Some("Please enter a valid phone number".to_string()),
            form: CallbackRequest {
                name: "Ravi <b>".to_string(),
                phone: "12".to_string(),
                notes: None,
            },
        };
        let html = callback_dialog(&ctx("/").with_callback(state)).into_string();
        assert!(html.contains("Please enter a valid phone number"));
        assert!(html.contains("Ravi &lt;b&gt;"));
    }
}
