//! Admin sessions: the access token travels in a cookie for the HTML area and
//! as a bearer token for API clients.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, warn};

use crate::web::AppState;

pub const SESSION_COOKIE: &str = "sb-access-token";

/// Signed-in user allowed to manage listings
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser {
    pub token: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// No token, or the auth service does not know it
    SignedOut,
    /// Authenticated but not on the admin allow-list
    NotAdmin,
    /// The auth service could not be reached
    Unavailable,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Cookie first, then the `Authorization` header
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
}

pub async fn authenticate(state: &AppState, token: Option<String>) -> Result<AdminUser, Denied> {
    let token = token.ok_or(Denied::SignedOut)?;
    let user = match state.auth.user_for_token(&token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Denied::SignedOut),
        Err(err) => {
            error!("Session check failed: {}", err);
            return Err(Denied::Unavailable);
        }
    };
    if !state.access.is_admin_email(user.email.as_deref()) {
        warn!(
            "Rejected admin access for {}",
            user.email.as_deref().unwrap_or(&user.id)
        );
        return Err(Denied::NotAdmin);
    }
    Ok(AdminUser {
        token,
        email: user.email,
    })
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let jar = CookieJar::new().add(session_cookie("from-cookie".to_string()));
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("t".to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
