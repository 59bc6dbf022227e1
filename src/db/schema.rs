//! Schema management with version-gated migrations.
//!
//! Each migration:
//! 1. Checks if the current schema version is below its target version
//! 2. Runs its SQL inside a transaction
//! 3. Records the new version in the `db_version` table
//!
//! New databases run every migration once; existing ones only the missing tail.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

/// Current schema version. Increment when adding a migration.
pub const DB_VERSION: i32 = 2;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("schema version: {}", current_version);

  if current_version < 1 {
    migrate_v0_to_v1(conn)?;
  }
  if current_version < 2 {
    migrate_v1_to_v2(conn)?;
  }

  Ok(())
}

/// v0→v1: users and sessions
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v0→v1: Create identity tables");

  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      username TEXT NOT NULL UNIQUE COLLATE NOCASE,
      password_hash TEXT NOT NULL,
      created_at TEXT NOT NULL,
      last_login_at TEXT
    );

    CREATE TABLE IF NOT EXISTS sessions (
      id TEXT PRIMARY KEY,
      user_id INTEGER NOT NULL,
      created_at TEXT NOT NULL,
      expires_at TEXT NOT NULL,
      last_access_at TEXT NOT NULL,
      FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
    "#,
  )?;
  record_version(&tx, 1, "Create identity tables (users, sessions)")?;
  tx.commit()
}

/// v1→v2: services and transactions
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v1→v2: Create servicios and transacciones");

  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS servicios (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      usuario_id INTEGER NOT NULL,
      nombre TEXT NOT NULL,
      monto REAL NOT NULL,
      fecha_vencimiento TEXT NOT NULL,
      recurrencia TEXT NOT NULL DEFAULT 'unico',
      estado TEXT NOT NULL DEFAULT 'pendiente',
      link_pago TEXT,
      categoria TEXT,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL,
      FOREIGN KEY (usuario_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS transacciones (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      usuario_id INTEGER NOT NULL,
      tipo TEXT NOT NULL,
      monto REAL NOT NULL,
      descripcion TEXT NOT NULL,
      categoria TEXT,
      fecha TEXT NOT NULL,
      recurrente INTEGER NOT NULL DEFAULT 0,
      servicio_id INTEGER,
      created_at TEXT NOT NULL,
      FOREIGN KEY (usuario_id) REFERENCES users(id) ON DELETE CASCADE,
      FOREIGN KEY (servicio_id) REFERENCES servicios(id) ON DELETE SET NULL
    );

    CREATE INDEX IF NOT EXISTS idx_servicios_usuario_fecha ON servicios(usuario_id, fecha_vencimiento);
    CREATE INDEX IF NOT EXISTS idx_servicios_estado ON servicios(estado);
    CREATE INDEX IF NOT EXISTS idx_transacciones_usuario ON transacciones(usuario_id);
    CREATE INDEX IF NOT EXISTS idx_transacciones_servicio ON transacciones(servicio_id);
    "#,
  )?;
  record_version(&tx, 2, "Create servicios and transacciones")?;
  tx.commit()
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now, description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Current schema version (0 if nothing recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table_exists(conn: &Connection, table: &str) -> bool {
    conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get::<_, i64>(0),
      )
      .map(|count| count == 1)
      .unwrap_or(false)
  }

  #[test]
  fn test_fresh_database_reaches_latest_version() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), DB_VERSION);
    for table in ["users", "sessions", "servicios", "transacciones"] {
      assert!(table_exists(&conn, table), "missing table {}", table);
    }
  }

  #[test]
  fn test_migrations_are_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();

    let recorded: i64 = conn
      .query_row("SELECT COUNT(*) FROM db_version", [], |row| row.get(0))
      .unwrap();
    assert_eq!(recorded, DB_VERSION as i64);
  }
}
