//! User and session persistence.

use chrono::{Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Result};

/// Create a new user, returns the user ID
pub fn create_user(conn: &Connection, username: &str, password_hash: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![username, password_hash, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by username, returns (user_id, password_hash)
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<(i64, String)>> {
    conn.query_row(
        "SELECT id, password_hash FROM users WHERE username = ?1",
        params![username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Check if a username already exists (case-insensitive)
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session_id,
            user_id,
            now.to_rfc3339(),
            expires.to_rfc3339(),
            now.to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Validate session and get user info, returns (user_id, username)
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<(i64, String)>> {
    let now = Utc::now().to_rfc3339();
    let user = conn
        .query_row(
            r#"
            SELECT u.id, u.username
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.id = ?1 AND s.expires_at > ?2
            "#,
            params![session_id, now],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if user.is_some() {
        conn.execute(
            "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
            params![now, session_id],
        )?;
    }
    Ok(user)
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
    Ok(count)
}

/// Generate a new 32-char lowercase alphanumeric session ID
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..32)
        .map(|_| {
            let idx = rng.random_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Usernames: 3-32 chars, ASCII alphanumeric or underscore
pub fn is_valid_username(username: &str) -> bool {
    username.len() >= 3
        && username.len() <= 32
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_session_lifecycle() {
        let conn = conn();
        let user_id = create_user(&conn, "ana", "hash").unwrap();
        let session_id = generate_session_id();
        create_session(&conn, user_id, &session_id, 1).unwrap();

        assert_eq!(
            get_session_user(&conn, &session_id).unwrap(),
            Some((user_id, "ana".to_string()))
        );

        delete_session(&conn, &session_id).unwrap();
        assert_eq!(get_session_user(&conn, &session_id).unwrap(), None);
    }

    #[test]
    fn test_expired_session_is_rejected_and_cleaned() {
        let conn = conn();
        let user_id = create_user(&conn, "ana", "hash").unwrap();
        create_session(&conn, user_id, "old", -1).unwrap();

        assert_eq!(get_session_user(&conn, "old").unwrap(), None);
        assert_eq!(cleanup_expired_sessions(&conn).unwrap(), 1);
    }

    #[test]
    fn test_username_lookup_is_case_insensitive() {
        let conn = conn();
        let user_id = create_user(&conn, "Ana", "hash").unwrap();
        assert!(username_exists(&conn, "ana").unwrap());
        assert_eq!(
            get_user_by_username(&conn, "ANA").unwrap(),
            Some((user_id, "hash".to_string()))
        );
        assert_eq!(get_user_by_username(&conn, "beto").unwrap(), None);
    }

    #[test]
    fn test_generate_session_id_shape() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("user_123"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username(&"a".repeat(33)));
        assert!(!is_valid_username("user name"));
        assert!(!is_valid_username("user-name"));
    }
}
