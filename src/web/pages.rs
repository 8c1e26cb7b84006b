use std::future::Future;

use axum::extract::{Form, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use maud::Markup;
use serde::Deserialize;
use tracing::{error, info};

use crate::catalog::{whatsapp_link, ListingFilter};
use crate::leads::{Decision, LeadError};
use crate::models::{CallbackRequest, ContactSubmission};
use crate::render::listings::{detail_page, error_page, home_page, listings_page, not_found_page};
use crate::render::pages::{about_page, contact_page, ContactStatus};
use crate::render::{CallbackState, PageContext};
use crate::web::{client_key, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    callback: Option<String>,
}

fn context(state: &AppState, path: &str, query: &PageQuery) -> PageContext {
    PageContext::new(path, whatsapp_link(state.whatsapp_number(), None))
        .with_callback(CallbackState::from_flag(query.callback.as_deref()))
}

fn html(status: StatusCode, markup: Markup) -> Response {
    (status, Html(markup.into_string())).into_response()
}

/// Serve from the page cache when the request has no query string; cache 200s.
/// `render` is only polled on a miss.
async fn cached<F>(state: &AppState, uri: &Uri, render: F) -> Response
where
    F: Future<Output = (StatusCode, Markup)>,
{
    let cacheable = uri.query().is_none();
    if cacheable {
        if let Some(page) = state.cache.get(uri.path()).await {
            return Html(page.as_str().to_string()).into_response();
        }
    }
    let (status, markup) = render.await;
    let body = markup.into_string();
    if cacheable && status == StatusCode::OK {
        state.cache.insert(uri.path(), body.clone()).await;
    }
    (status, Html(body)).into_response()
}

pub async fn home(State(state): State<AppState>, uri: Uri, Query(query): Query<PageQuery>) -> Response {
    let ctx = context(&state, "/", &query);
    cached(&state, &uri, async {
        (StatusCode::OK, home_page(&ctx, &state.catalog.home().await))
    })
    .await
}

pub async fn listings(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
    Query(filter): Query<ListingFilter>,
) -> Response {
    let ctx = context(&state, "/listings", &query);
    cached(&state, &uri, async {
        let cards = state.catalog.listing_cards(&filter).await;
        (StatusCode::OK, listings_page(&ctx, &filter, &cards))
    })
    .await
}

async fn render_detail(state: &AppState, key: &str, ctx: &PageContext) -> (StatusCode, Markup) {
    match state.catalog.detail(key).await {
        Ok(Some(detail)) => {
            // the enquiry link on a detail page names the property
            let mut ctx = ctx.clone();
            ctx.whatsapp_link = detail.whatsapp.clone();
            (StatusCode::OK, detail_page(&ctx, &detail))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            not_found_page(ctx, "We couldn't find that property. It may have been sold or removed."),
        ),
        Err(err) => {
            error!("Failed to load property {}: {}", key, err);
            (StatusCode::INTERNAL_SERVER_ERROR, error_page(ctx))
        }
    }
}

pub async fn detail(
    State(state): State<AppState>,
    uri: Uri,
    Path(key): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let ctx = context(&state, &format!("/listings/{}", key), &query);
    cached(&state, &uri, render_detail(&state, &key, &ctx)).await
}

pub async fn about(State(state): State<AppState>, uri: Uri, Query(query): Query<PageQuery>) -> Response {
    let ctx = context(&state, "/about", &query);
    cached(&state, &uri, async { (StatusCode::OK, about_page(&ctx)) }).await
}

pub async fn contact_form(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let ctx = context(&state, "/contact", &query);
    html(
        StatusCode::OK,
        contact_page(&ctx, &ContactSubmission::default(), &ContactStatus::Blank),
    )
}

fn lead_failure(err: &LeadError) -> StatusCode {
    match err {
        LeadError::Invalid(_) => StatusCode::BAD_REQUEST,
        LeadError::NotConfigured | LeadError::SendFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(submission): Form<ContactSubmission>,
) -> Response {
    let ctx = context(&state, "/contact", &PageQuery::default());
    if let Decision::Limited { retry_after } = state.limiter.check(&client_key(&headers)).await {
        let status = ContactStatus::Failed(format!(
            "Too many messages. Please try again in {} seconds.",
            retry_after
        ));
        return html(StatusCode::TOO_MANY_REQUESTS, contact_page(&ctx, &submission, &status));
    }
    match state.leads.send_contact(&submission).await {
        Ok(()) => html(
            StatusCode::OK,
            contact_page(&ctx, &ContactSubmission::default(), &ContactStatus::Sent),
        ),
        Err(err) => {
            let status = ContactStatus::Failed(err.to_string());
            html(lead_failure(&err), contact_page(&ctx, &submission, &status))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    return_to: String,
}

/// Only same-site paths; anything else goes home
fn safe_return_path(raw: &str) -> String {
    let path = raw.trim();
    let path = path.split(['?', '#']).next().unwrap_or("");
    if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') {
        path.to_string()
    } else {
        "/".to_string()
    }
}

pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CallbackForm>,
) -> Response {
    let return_to = safe_return_path(&form.return_to);
    let request = CallbackRequest {
        name: form.name,
        phone: form.phone,
        notes: Some(form.notes.trim().to_string()).filter(|n| !n.is_empty()),
    };

    let outcome = match state.limiter.check(&client_key(&headers)).await {
        Decision::Limited { retry_after } => Err((
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests. Please try again in {} seconds.", retry_after),
        )),
        Decision::Allowed => state
            .leads
            .send_callback(&request)
            .await
            .map_err(|err| (lead_failure(&err), err.to_string())),
    };

    match outcome {
        Ok(()) => {
            info!("📞 Callback requested from {}", return_to);
            Redirect::to(&format!("{}?callback=sent", return_to)).into_response()
        }
        Err((status, message)) => {
            let ctx = PageContext::new(return_to.clone(), whatsapp_link(state.whatsapp_number(), None))
                .with_callback(CallbackState::Open {
                    error: Some(message),
                    form: request,
                });
            let (_, markup) = render_path(&state, &return_to, &ctx).await;
            html(status, markup)
        }
    }
}

/// Re-render a public page with the given context, for form errors
async fn render_path(state: &AppState, path: &str, ctx: &PageContext) -> (StatusCode, Markup) {
    match path {
        "/" => (StatusCode::OK, home_page(ctx, &state.catalog.home().await)),
        "/listings" => {
            let filter = ListingFilter::default();
            let cards = state.catalog.listing_cards(&filter).await;
            (StatusCode::OK, listings_page(ctx, &filter, &cards))
        }
        "/about" => (StatusCode::OK, about_page(ctx)),
        "/contact" => (
            StatusCode::OK,
            contact_page(ctx, &ContactSubmission::default(), &ContactStatus::Blank),
        ),
        other => match other.strip_prefix("/listings/") {
            Some(key) if !key.is_empty() => render_detail(state, key, ctx).await,
            _ => (StatusCode::OK, home_page(ctx, &state.catalog.home().await)),
        },
    }
}

/// Uploaded objects kept in process memory
pub async fn media(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some(media) = state.media.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match media.get(&key).await {
        Some(object) => ([(CONTENT_TYPE, object.content_type)], object.body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    let ctx = context(&state, uri.path(), &PageQuery::default());
    html(
        StatusCode::NOT_FOUND,
        not_found_page(&ctx, "The page you were looking for doesn't exist."),
    )
}
