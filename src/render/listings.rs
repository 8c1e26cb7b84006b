use maud::{html, Markup};

use crate::catalog::{HomeView, ListingCard, ListingFilter, PropertyDetail};
use crate::images::PLACEHOLDER;
use crate::models::GalleryItem;
use crate::render::{base_document, PageContext};

const KINDS: [&str; 4] = ["Apartment", "Villa", "Office", "Studio"];

pub fn property_card(card: &ListingCard) -> Markup {
    let p = &card.property;
    html! {
        article.card {
            a href=(card.href) {
                img src=(card.image) alt=(p.title) loading="lazy"
                    onerror={ "this.onerror=null;this.src='" (PLACEHOLDER) "'" };
            }
            div.card-body {
                h3 { a href=(card.href) { (p.title) } }
                @if let Some(tagline) = &p.tagline {
                    p.tagline { (tagline) }
                }
                p.meta {
                    @if let Some(location) = &p.location { span { (location) } }
                    @if let Some(kind) = &p.kind { span { (kind) } }
                    @if let Some(bedrooms) = p.bedrooms.filter(|b| *b > 0) {
                        span { (bedrooms) " bed" }
                    }
                }
                p.price { (card.price_label) }
            }
        }
    }
}

fn card_grid(cards: &[ListingCard]) -> Markup {
    html! {
        div.grid {
            @for card in cards { (property_card(card)) }
        }
    }
}

pub fn gallery(items: &[GalleryItem]) -> Markup {
    html! {
        div.gallery {
            @for item in items {
                figure {
                    @if let Some(href) = &item.href {
                        a href=(href) { img src=(item.src) alt=(item.alt) loading="lazy"; }
                    } @else {
                        img src=(item.src) alt=(item.alt) loading="lazy";
                    }
                    @if let Some(caption) = &item.caption {
                        figcaption { (caption) }
                    }
                }
            }
        }
    }
}

pub fn home_page(ctx: &PageContext, view: &HomeView) -> Markup {
    let content = html! {
        section.hero {
            h1 { "Find your next home" }
            p { "Apartments, villas and offices, hand-picked and verified." }
            a.button href="/listings" { "Browse listings" }
        }
        section {
            h2 { "Gallery" }
            (gallery(&view.gallery))
        }
        @if !view.featured.is_empty() {
            section {
                h2 { "Featured properties" }
                (card_grid(&view.featured))
            }
        }
    };
    base_document("", ctx, content)
}

fn filter_bar(filter: &ListingFilter) -> Markup {
    let current_kind = filter.kind.as_deref().unwrap_or("");
    html! {
        form.filters method="get" action="/listings" {
            select name="kind" {
                option value="" { "All types" }
                @for kind in KINDS {
                    option value=(kind) selected[current_kind.eq_ignore_ascii_case(kind)] { (kind) }
                }
            }
            input type="number" name="min_bedrooms" min="0" placeholder="Min beds"
                value=[filter.min_bedrooms];
            input type="number" name="min_price" min="0" placeholder="Min price"
                value=[filter.min_price];
            input type="number" name="max_price" min="0" placeholder="Max price"
                value=[filter.max_price];
            button type="submit" { "Filter" }
            @if !filter.is_empty() {
                a href="/listings" { "Clear" }
            }
        }
    }
}

pub fn listings_page(ctx: &PageContext, filter: &ListingFilter, cards: &[ListingCard]) -> Markup {
    let content = html! {
        h1 { "Listings" }
        (filter_bar(filter))
        @if cards.is_empty() {
            p.empty { "No properties match right now. Check back soon." }
        } @else {
            p.count { (cards.len()) " properties" }
            (card_grid(cards))
        }
    };
    base_document("Listings", ctx, content)
}

pub fn detail_page(ctx: &PageContext, detail: &PropertyDetail) -> Markup {
    let p = &detail.property;
    let (lead, rest) = match detail.gallery.split_first() {
        Some((lead, rest)) => (Some(lead), rest),
        None => (None, &[][..]),
    };
    let content = html! {
        article.detail {
            div.detail-gallery {
                @if let Some(lead) = lead {
                    img.lead src=(lead.src) alt=(lead.alt)
                        onerror={ "this.onerror=null;this.src='" (PLACEHOLDER) "'" };
                }
                @if !rest.is_empty() {
                    div.thumbs {
                        @for item in rest {
                            img src=(item.src) alt=(item.alt) loading="lazy";
                        }
                    }
                }
            }
            div.detail-body {
                h1 { (p.title) }
                @if let Some(tagline) = &p.tagline { p.tagline { (tagline) } }
                div.price-card {
                    span.label { "Price" }
                    span.price { (detail.price_label) }
                }
                dl.facts {
                    @if let Some(location) = &p.location { dt { "Location" } dd { (location) } }
                    @if let Some(kind) = &p.kind { dt { "Type" } dd { (kind) } }
                    @if let Some(bedrooms) = p.bedrooms { dt { "Bedrooms" } dd { (bedrooms) } }
                }
                @if let Some(description) = &p.description {
                    div.description {
                        @for paragraph in description.split("\n\n") {
                            p { (paragraph) }
                        }
                    }
                }
                div.actions {
                    a.button.whatsapp href=(detail.whatsapp) target="_blank" rel="noopener noreferrer" {
                        "Enquire on WhatsApp"
                    }
                    a.button.secondary href={ (ctx.path) "?callback=open" } { "Request callback" }
                }
            }
            section.map {
                h2 { "Location" }
                @if let Some(map) = &detail.map {
                    iframe src=(map.embed) title={ "Map of " (p.title) } loading="lazy"
                        referrerpolicy="no-referrer-when-downgrade" {}
                    p { a href=(map.link) target="_blank" rel="noopener noreferrer" { "Open in Google Maps" } }
                } @else {
                    p.muted { "No location available" }
                }
            }
        }
    };
    base_document(&p.title, ctx, content)
}

pub fn not_found_page(ctx: &PageContext, what: &str) -> Markup {
    let content = html! {
        section.not-found {
            h1 { "Not found" }
            p { (what) }
            a.button href="/listings" { "Back to listings" }
        }
    };
    base_document("Not found", ctx, content)
}

pub fn error_page(ctx: &PageContext) -> Markup {
    let content = html! {
        section.not-found {
            h1 { "Something went wrong" }
            p { "We could not load this page. Please try again in a moment." }
        }
    };
    base_document("Error", ctx, content)
}
