//! JSON endpoints for services.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::try_lock;
use crate::domain::service::validate_status;
use crate::domain::{FieldError, Service, ServiceDraft, ServicePatch};
use crate::error::ApiError;
use crate::services::{self, ListFilter};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, alias = "month")]
    pub mes: Option<u32>,
    #[serde(default, alias = "year")]
    pub anio: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub estado: Option<String>,
}

/// GET /api/servicios
pub async fn list_services(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Service>>, ApiError> {
    let Query(query) = query?;
    let filter = ListFilter {
        month: query.mes,
        year: query.anio,
    };

    let conn = try_lock(&state.db)?;
    let services = services::list_services(&conn, auth.user_id, &filter, Utc::now())?;
    Ok(Json(services))
}

/// POST /api/servicios
pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<Json<ServiceDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let Json(draft) = body?;

    let conn = try_lock(&state.db)?;
    let service = services::create_service(&conn, auth.user_id, draft, Utc::now())?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// PUT|PATCH /api/servicios/{id}
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ServicePatch>, JsonRejection>,
) -> Result<Json<Service>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = body?;

    let conn = try_lock(&state.db)?;
    let service = services::update_service(&conn, auth.user_id, id, patch, Utc::now())?;
    Ok(Json(service))
}

/// PUT|PATCH /api/servicios/{id}/estado
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<Service>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let raw = body
        .estado
        .filter(|s| !s.trim().is_empty())
        .ok_or(FieldError::Missing("estado"))?;
    let status = validate_status(&raw)?;

    let conn = try_lock(&state.db)?;
    let service = services::change_status(&conn, auth.user_id, id, status, Utc::now())?;
    Ok(Json(service))
}

/// DELETE /api/servicios/{id}
pub async fn delete_service(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;

    let conn = try_lock(&state.db)?;
    services::delete_service(&conn, auth.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
