//! JSON endpoints: lead relays, the revalidation webhook and image reordering.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::leads::Decision;
use crate::models::{CallbackRequest, ContactSubmission};
use crate::web::admin::invalidate_listing;
use crate::web::session::{authenticate, bearer_token, session_token, Denied};
use crate::web::{client_key, AppState};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text())))
}

async fn rate_limit(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match state.limiter.check(&client_key(headers)).await {
        Decision::Allowed => Ok(()),
        Decision::Limited { retry_after } => Err(ApiError::RateLimited { retry_after }),
    }
}

pub async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    rate_limit(&state, &headers).await?;
    let submission = body(payload)?;
    state.leads.send_contact(&submission).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    rate_limit(&state, &headers).await?;
    let request = body(payload)?;
    state.leads.send_callback(&request).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RevalidateRequest {
    #[serde(default)]
    paths: Option<Vec<String>>,
}

fn webhook_error(status: StatusCode, message: &str) -> ApiError {
    ApiError::Webhook {
        status,
        message: message.to_string(),
    }
}

fn secret_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Shared secret first; otherwise a bearer token checked against the auth service
async fn authorize_webhook(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let (Some(presented), Some(expected)) = (presented, state.access.revalidate_secret.as_deref()) {
        if secret_matches(presented, expected) {
            return Ok(());
        }
    }

    match authenticate(state, bearer_token(headers)).await {
        Ok(_) => Ok(()),
        Err(Denied::NotAdmin) => Err(webhook_error(StatusCode::FORBIDDEN, "Forbidden")),
        Err(Denied::Unavailable) => Err(webhook_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Auth service unavailable",
        )),
        Err(Denied::SignedOut) => {
            if presented.is_some() {
                warn!("Revalidation rejected: wrong webhook secret");
            }
            Err(webhook_error(StatusCode::UNAUTHORIZED, "Invalid credentials"))
        }
    }
}

pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RevalidateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    authorize_webhook(&state, &headers).await?;

    let paths: Vec<String> = payload
        .map(|Json(request)| request.paths.unwrap_or_default())
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if paths.is_empty() {
        return Err(webhook_error(
            StatusCode::BAD_REQUEST,
            "Body must include a non-empty \"paths\" array",
        ));
    }

    for path in &paths {
        state.cache.invalidate(path).await;
    }
    info!("♻️  Revalidated {} paths", paths.len());
    Ok(Json(json!({ "revalidated": true, "paths": paths })))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    image_ids: Vec<String>,
}

pub async fn reorder(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, session_token(&jar, &headers))
        .await
        .map_err(|denied| match denied {
            Denied::SignedOut => ApiError::Unauthorized("Sign in required".to_string()),
            Denied::NotAdmin => ApiError::Forbidden("Forbidden".to_string()),
            Denied::Unavailable => ApiError::Internal("Auth service unavailable".to_string()),
        })?;
    let request = body(payload)?;
    if request.image_ids.is_empty() {
        return Err(ApiError::BadRequest("image_ids must not be empty".to_string()));
    }
    state
        .admin
        .reorder_images(&user.token, &id, &request.image_ids)
        .await?;
    invalidate_listing(&state, &id).await;
    Ok(Json(json!({ "ok": true, "count": request.image_ids.len() })))
}
