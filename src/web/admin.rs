//! Admin area handlers. Every page except the login form requires a session.

use std::collections::HashMap;

use axum::extract::{Form, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use futures::future::join_all;
use maud::Markup;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::admin::{AdminError, PropertyInput, UploadFile};
use crate::backends::AuthError;
use crate::catalog::PRICE_MISSING;
use crate::error::ApiError;
use crate::render::admin::{
    confirm_page, edit_page, flash_message, login_page, message_page, properties_page, AdminImage,
    AdminListing, UploadStatus,
};
use crate::web::session::{authenticate, clear_session, session_cookie, session_token, AdminUser, Denied};
use crate::web::AppState;

fn html(status: StatusCode, markup: Markup) -> Response {
    (status, Html(markup.into_string())).into_response()
}

/// Session check for HTML pages: signed-out users go to the login form
async fn require_admin(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Result<AdminUser, Response> {
    match authenticate(state, session_token(jar, headers)).await {
        Ok(user) => Ok(user),
        Err(Denied::SignedOut) => Err(Redirect::to("/admin/login").into_response()),
        Err(Denied::NotAdmin) => Err(html(
            StatusCode::FORBIDDEN,
            login_page("", Some("This account is not allowed to manage listings")),
        )),
        Err(Denied::Unavailable) => Err(html(
            StatusCode::SERVICE_UNAVAILABLE,
            login_page("", Some("Sign-in is unavailable right now, try again shortly")),
        )),
    }
}

fn upload_status(state: &AppState) -> UploadStatus {
    match state.admin.bucket_name() {
        Some(bucket) => UploadStatus::Ready {
            bucket: bucket.to_string(),
        },
        None => UploadStatus::MissingBucket,
    }
}

/// Status code and message shown for a failed admin action
fn failure(err: AdminError) -> (StatusCode, String) {
    let api = ApiError::from(err);
    (api.status(), api.to_string())
}

/// Text fields plus the files of the `images` input; empty file parts are skipped
async fn read_form(mut multipart: Multipart) -> Result<(HashMap<String, String>, Vec<UploadFile>), AdminError> {
    let malformed = |err: axum::extract::multipart::MultipartError| {
        AdminError::Validation(format!("Could not read the submitted form: {}", err))
    };
    let mut fields = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(malformed)?;
                if name == "images" && !file_name.is_empty() && !body.is_empty() {
                    files.push(UploadFile::new(file_name, content_type, body));
                }
            }
            None => {
                let value = field.text().await.map_err(malformed)?;
                fields.insert(name, value);
            }
        }
    }
    Ok((fields, files))
}

/// Drop cached public pages showing this property
pub(crate) async fn invalidate_listing(state: &AppState, id: &str) {
    match state.catalog.backend().property_by_id(id).await {
        Ok(Some(property)) => state.cache.invalidate_property(&property).await,
        _ => state.cache.invalidate_all().await,
    }
}

pub async fn index() -> Redirect {
    Redirect::to("/admin/properties")
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn login_form() -> Response {
    html(StatusCode::OK, login_page("", None))
}

pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let email = form.email.trim();
    match state.auth.sign_in(email, &form.password).await {
        Ok(session) => {
            if !state.access.is_admin_email(session.user.email.as_deref()) {
                warn!("Sign-in by {} refused: not an admin", email);
                if let Err(err) = state.auth.sign_out(&session.access_token).await {
                    warn!("Sign-out after refused login failed: {}", err);
                }
                return html(
                    StatusCode::FORBIDDEN,
                    login_page(email, Some("This account is not allowed to manage listings")),
                );
            }
            info!("🔑 Admin {} signed in", email);
            let jar = jar.add(session_cookie(session.access_token));
            (jar, Redirect::to("/admin/properties")).into_response()
        }
        Err(AuthError::InvalidCredentials) => html(
            StatusCode::UNAUTHORIZED,
            login_page(email, Some("Invalid email or password")),
        ),
        Err(err) => {
            error!("Sign-in failed: {}", err);
            html(
                StatusCode::SERVICE_UNAVAILABLE,
                login_page(email, Some("Sign-in is unavailable right now, try again shortly")),
            )
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&jar, &headers) {
        if let Err(err) = state.auth.sign_out(&token).await {
            warn!("Sign-out failed: {}", err);
        }
    }
    (clear_session(jar), Redirect::to("/admin/login")).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct DoneQuery {
    done: Option<String>,
}

async fn render_list(state: &AppState, user: &AdminUser, flash: Option<&str>, error: Option<&str>) -> (StatusCode, Markup) {
    let (status, properties, error) = match state.admin.list().await {
        Ok(properties) => (StatusCode::OK, properties, error.map(str::to_string)),
        Err(err) => {
            error!("Admin listing failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Vec::new(),
                Some(err.to_string()),
            )
        }
    };
    let listings = join_all(properties.into_iter().map(|property| async move {
        let thumbnail = state
            .catalog
            .resolver()
            .resolve_or_placeholder(property.main_image.as_deref())
            .await;
        let price_label = state
            .catalog
            .site()
            .price_format
            .format(property.price)
            .unwrap_or_else(|| PRICE_MISSING.to_string());
        AdminListing {
            property,
            thumbnail,
            price_label,
        }
    }))
    .await;
    let markup = properties_page(
        user.email.as_deref(),
        &listings,
        &upload_status(state),
        flash,
        error.as_deref(),
    );
    (status, markup)
}

pub async fn list_properties(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<DoneQuery>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let flash = query.done.as_deref().and_then(flash_message);
    let (status, markup) = render_list(&state, &user, flash, None).await;
    html(status, markup)
}

pub async fn create_property(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let result = async {
        let (fields, files) = read_form(multipart).await?;
        let input = PropertyInput::from_form(&fields)?;
        state.admin.create_property(&user.token, input, &files).await
    }
    .await;

    match result {
        Ok(property) => {
            state.cache.invalidate_property(&property).await;
            Redirect::to(&format!("/admin/properties/{}?done=created", property.id)).into_response()
        }
        Err(err) => {
            let (status, message) = failure(err);
            let (_, markup) = render_list(&state, &user, None, Some(&message)).await;
            html(status, markup)
        }
    }
}

async fn render_edit(
    state: &AppState,
    user: &AdminUser,
    id: &str,
    flash: Option<&str>,
    error: Option<&str>,
) -> (StatusCode, Markup) {
    let (property, images) = match state.admin.load(id).await {
        Ok(loaded) => loaded,
        Err(AdminError::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                message_page(user.email.as_deref(), "Not found", "That property does not exist."),
            )
        }
        Err(err) => {
            error!("Failed to load property {} for editing: {}", id, err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                message_page(user.email.as_deref(), "Error", &err.to_string()),
            );
        }
    };
    let main = property.main_image.as_deref();
    let images = join_all(images.into_iter().map(|image| async move {
        let src = state
            .catalog
            .resolver()
            .resolve_or_placeholder(Some(&image.image))
            .await;
        AdminImage {
            is_main: main == Some(image.image.as_str()),
            image,
            src,
        }
    }))
    .await;
    let markup = edit_page(
        user.email.as_deref(),
        &property,
        &images,
        &upload_status(state),
        flash,
        error,
    );
    (StatusCode::OK, markup)
}

pub async fn edit_property(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<DoneQuery>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let flash = query.done.as_deref().and_then(flash_message);
    let (status, markup) = render_edit(&state, &user, &id, flash, None).await;
    html(status, markup)
}

/// Re-render the edit page with an error, keeping the failure's status
async fn edit_failure(state: &AppState, user: &AdminUser, id: &str, err: AdminError) -> Response {
    let (status, message) = failure(err);
    let (page_status, markup) = render_edit(state, user, id, None, Some(&message)).await;
    let status = if page_status == StatusCode::OK { status } else { page_status };
    html(status, markup)
}

pub async fn update_property(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let result = async {
        let (fields, files) = read_form(multipart).await?;
        let input = PropertyInput::from_form(&fields)?;
        state.admin.update_property(&user.token, &id, input, &files).await
    }
    .await;

    match result {
        Ok(property) => {
            // the slug may have changed, so old detail URLs go too
            state.cache.invalidate_all().await;
            Redirect::to(&format!("/admin/properties/{}?done=updated", property.id)).into_response()
        }
        Err(err) => edit_failure(&state, &user, &id, err).await,
    }
}

/// Image ids sorted by the positions typed into the edit form; blanks go last
fn ordered_ids(positions: HashMap<String, String>) -> Vec<String> {
    let mut entries: Vec<(u32, String)> = positions
        .into_iter()
        .map(|(id, position)| (position.trim().parse().unwrap_or(u32::MAX), id))
        .collect();
    entries.sort();
    entries.into_iter().map(|(_, id)| id).collect()
}

pub async fn save_order(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(positions): Form<HashMap<String, String>>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let image_ids = ordered_ids(positions);
    match state.admin.reorder_images(&user.token, &id, &image_ids).await {
        Ok(()) => {
            invalidate_listing(&state, &id).await;
            Redirect::to(&format!("/admin/properties/{}?done=order-saved", id)).into_response()
        }
        Err(err) => edit_failure(&state, &user, &id, err).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct MainForm {
    image_id: String,
}

pub async fn set_main(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<MainForm>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    match state.admin.set_main_image(&user.token, &id, &form.image_id).await {
        Ok(()) => {
            invalidate_listing(&state, &id).await;
            Redirect::to(&format!("/admin/properties/{}?done=main-set", id)).into_response()
        }
        Err(err) => edit_failure(&state, &user, &id, err).await,
    }
}

pub async fn confirm_delete_property(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let title = match state.admin.load(&id).await {
        Ok((property, _)) => property.title,
        Err(_) => {
            return html(
                StatusCode::NOT_FOUND,
                message_page(user.email.as_deref(), "Not found", "That property does not exist."),
            )
        }
    };
    let action = format!("/admin/properties/{}/delete", id);
    let cancel = format!("/admin/properties/{}", id);
    html(
        StatusCode::OK,
        confirm_page(
            user.email.as_deref(),
            "Delete property",
            &format!("Delete \"{}\" and all of its gallery images?", title),
            &action,
            &cancel,
        ),
    )
}

pub async fn delete_property(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    match state.admin.delete_property(&user.token, &id).await {
        Ok(property) => {
            state.cache.invalidate_property(&property).await;
            Redirect::to("/admin/properties?done=deleted").into_response()
        }
        Err(err) => edit_failure(&state, &user, &id, err).await,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    property_id: Option<String>,
}

fn back_to(property_id: Option<&str>) -> String {
    match property_id {
        Some(id) => format!("/admin/properties/{}", id),
        None => "/admin/properties".to_string(),
    }
}

pub async fn confirm_delete_image(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(image_id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let property_id = query.property_id.as_deref().filter(|id| !id.is_empty());
    let action = match property_id {
        Some(pid) => format!(
            "/admin/images/{}/delete?property_id={}",
            image_id,
            urlencoding::encode(pid)
        ),
        None => format!("/admin/images/{}/delete", image_id),
    };
    html(
        StatusCode::OK,
        confirm_page(
            user.email.as_deref(),
            "Delete image",
            "Remove this image from the gallery?",
            &action,
            &back_to(property_id),
        ),
    )
}

pub async fn delete_image(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(image_id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Response {
    let user = match require_admin(&state, &jar, &headers).await {
        Ok(user) => user,
        Err(denied) => return denied,
    };
    let property_id = query.property_id.as_deref().filter(|id| !id.is_empty());
    match state.admin.delete_image(&user.token, &image_id, property_id).await {
        Ok(()) => {
            match property_id {
                Some(pid) => invalidate_listing(&state, pid).await,
                None => state.cache.invalidate_all().await,
            }
            Redirect::to(&format!("{}?done=image-deleted", back_to(property_id))).into_response()
        }
        Err(err) => match property_id {
            Some(pid) => edit_failure(&state, &user, pid, err).await,
            None => {
                let (status, message) = failure(err);
                html(status, message_page(user.email.as_deref(), "Error", &message))
            }
        },
    }
}
