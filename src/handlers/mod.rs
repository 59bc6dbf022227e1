pub mod servicios;

use axum::{
  routing::{get, patch, post},
  Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/auth/register", post(auth::register))
    .route("/api/auth/login", post(auth::login))
    .route("/api/auth/logout", post(auth::logout))
    .route(
      "/api/servicios",
      get(servicios::list_services).post(servicios::create_service),
    )
    .route(
      "/api/servicios/{id}",
      patch(servicios::update_service)
        .put(servicios::update_service)
        .delete(servicios::delete_service),
    )
    .route(
      "/api/servicios/{id}/estado",
      patch(servicios::change_status).put(servicios::change_status),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
