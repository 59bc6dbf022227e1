pub mod schema;
pub mod services;
pub mod transactions;

use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Error returned when the database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database unavailable")
    }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
    pool.lock().map_err(|_: PoisonError<_>| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        DbLockError
    })
}

/// Open (creating if needed) the database file and bring its schema up to date
pub fn init_db(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .log_warn(&format!("Could not create {}", parent.display()));
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database with the full schema (tests, throwaway instances)
pub fn init_memory_db() -> Result<DbPool> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_warn_passes_values_through() {
        let ok: std::result::Result<i32, String> = Ok(4);
        assert_eq!(ok.log_warn("ctx"), Some(4));

        let err: std::result::Result<i32, String> = Err("boom".into());
        assert_eq!(err.log_warn("ctx"), None);

        let err: std::result::Result<Vec<i32>, String> = Err("boom".into());
        assert!(err.log_warn_default("ctx").is_empty());
    }

    #[test]
    fn test_init_db_creates_parent_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("finanzas.db");
        let pool = init_db(&path).unwrap();

        assert!(path.exists());
        let conn = try_lock(&pool).unwrap();
        assert_eq!(schema::get_schema_version(&conn).unwrap(), schema::DB_VERSION);
    }
}
