//! Test utilities for database setup.
//!
//! Reuses the authoritative migrations so tests never carry a copy of the
//! schema.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tempfile::TempDir;

use crate::auth::db as auth_db;
use crate::db::{run_migrations, services};
use crate::domain::dates::normalize_due_date;
use crate::domain::{NewService, Recurrence, ServiceStatus};

/// File-backed database with the full schema and one registered user.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
    /// Owner used by default in tests
    pub user_id: i64,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("finanzas.db"))?;
        run_migrations(&conn)?;
        let user_id = auth_db::create_user(&conn, "tester", "not-a-real-hash")?;

        Ok(Self {
            temp,
            conn,
            user_id,
        })
    }

    /// Register another user, returning their id
    pub fn create_user(&self, username: &str) -> rusqlite::Result<i64> {
        auth_db::create_user(&self.conn, username, "not-a-real-hash")
    }

    /// Insert a plain pending service for the default user
    pub fn insert_service(&self, name: &str) -> rusqlite::Result<i64> {
        let service = NewService {
            name: name.to_string(),
            amount: 20.0,
            due_date: normalize_due_date(
                NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date"),
            ),
            recurrence: Recurrence::Once,
            status: ServiceStatus::Pending,
            payment_link: None,
            category: None,
        };
        services::insert_service(&self.conn, self.user_id, &service, Utc::now())
    }
}
