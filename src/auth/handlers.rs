//! JSON handlers for register, login and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use super::db as auth_db;
use super::middleware::{session_id_from_headers, SESSION_COOKIE_NAME};
use super::password;
use crate::config::SESSION_DURATION_HOURS;
use crate::db::{try_lock, LogOnError};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: i64,
    pub username: String,
    /// Also usable as a bearer token
    pub session: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;

    if !auth_db::is_valid_username(&form.username) {
        return Err(ApiError::BadRequest(
            "Username must be 3-32 alphanumeric characters or underscores".to_string(),
        ));
    }
    if form.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = password::hash_password(&form.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let conn = try_lock(&state.db)?;
    if auth_db::username_exists(&conn, &form.username)? {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let user_id = auth_db::create_user(&conn, &form.username, &password_hash)?;
    let session_id = auth_db::generate_session_id();
    auth_db::create_session(&conn, user_id, &session_id, SESSION_DURATION_HOURS)?;
    drop(conn);

    tracing::info!("Registered user {} ({})", form.username, user_id);

    let body = SessionResponse {
        user_id,
        username: form.username,
        session: session_id.clone(),
    };
    Ok((StatusCode::CREATED, jar.add(session_cookie(session_id)), Json(body)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;

    if form.username.is_empty() || form.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let conn = try_lock(&state.db)?;
    let Some((user_id, stored_hash)) = auth_db::get_user_by_username(&conn, &form.username)? else {
        return Err(ApiError::Unauthorized);
    };

    if !password::verify_password(&form.password, &stored_hash) {
        tracing::debug!("Failed login for {}", form.username);
        return Err(ApiError::Unauthorized);
    }

    auth_db::update_last_login(&conn, user_id)
        .log_warn(&format!("Failed to update last login for user {}", user_id));

    let session_id = auth_db::generate_session_id();
    auth_db::create_session(&conn, user_id, &session_id, SESSION_DURATION_HOURS)?;
    drop(conn);

    let body = SessionResponse {
        user_id,
        username: form.username,
        session: session_id.clone(),
    };
    Ok((jar.add(session_cookie(session_id)), Json(body)))
}

/// POST /api/auth/logout
///
/// Ends the session named by the cookie or the bearer token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = session_id_from_headers(&headers) {
        let conn = try_lock(&state.db)?;
        auth_db::delete_session(&conn, &session_id)?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .path("/")
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .max_age(time::Duration::hours(SESSION_DURATION_HOURS))
        .build()
}
