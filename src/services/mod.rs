//! Business logic over the database layer.

pub mod lifecycle;

use thiserror::Error;

use crate::domain::FieldError;

pub use lifecycle::{
    change_status, create_service, delete_service, list_services, update_service, ListFilter,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("service {0} not found")]
    NotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}
