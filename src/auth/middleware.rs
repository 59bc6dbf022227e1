//! Authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use super::db as auth_db;
use crate::db::try_lock;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "ft_session";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication; requests
/// without a valid session get a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id =
            session_id_from_headers(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let conn = try_lock(&state.db)?;
        let (user_id, username) = auth_db::get_session_user(&conn, &session_id)?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthContext { user_id, username })
    }
}

/// Session id from the session cookie, falling back to a bearer token
pub(crate) fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: (&str, &str)) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/api/servicios")
            .header(header.0, header.1)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_session_from_cookie() {
        let parts = parts(("cookie", "other=1; ft_session=abc123"));
        assert_eq!(session_id_from_headers(&parts.headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_session_from_bearer() {
        let parts = parts(("authorization", "Bearer tok42"));
        assert_eq!(session_id_from_headers(&parts.headers), Some("tok42".to_string()));
    }

    #[test]
    fn test_no_credentials() {
        let parts = parts(("authorization", "Basic dXNlcjpwYXNz"));
        assert_eq!(session_id_from_headers(&parts.headers), None);
    }
}
