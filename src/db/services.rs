//! `servicios` table access. Every query is scoped by owner.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::dates::{from_db_string, to_db_string};
use crate::domain::{NewService, Recurrence, Service, ServiceStatus};

const SERVICE_COLUMNS: &str = "id, nombre, monto, fecha_vencimiento, recurrencia, estado, link_pago, categoria, usuario_id";

/// Optional `[start, end)` due-date window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DueWindow {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    fn bounds(&self) -> (Option<String>, Option<String>) {
        (self.start.map(to_db_string), self.end.map(to_db_string))
    }
}

pub fn insert_service(
    conn: &Connection,
    owner_id: i64,
    service: &NewService,
    now: DateTime<Utc>,
) -> Result<i64> {
    let now = to_db_string(now);
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO servicios (usuario_id, nombre, monto, fecha_vencimiento, recurrencia, estado,
                               link_pago, categoria, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )?;
    stmt.execute(params![
        owner_id,
        service.name,
        service.amount,
        to_db_string(service.due_date),
        service.recurrence.as_str(),
        service.status.as_str(),
        service.payment_link,
        service.category,
        now,
    ])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_service(conn: &Connection, owner_id: i64, id: i64) -> Result<Option<Service>> {
    conn.query_row(
        &format!("SELECT {} FROM servicios WHERE id = ?1 AND usuario_id = ?2", SERVICE_COLUMNS),
        params![id, owner_id],
        row_to_service,
    )
    .optional()
}

/// Services of an owner inside the window, ordered by due date
pub fn list_services(conn: &Connection, owner_id: i64, window: &DueWindow) -> Result<Vec<Service>> {
    let (start, end) = window.bounds();
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM servicios
        WHERE usuario_id = ?1
          AND (?2 IS NULL OR fecha_vencimiento >= ?2)
          AND (?3 IS NULL OR fecha_vencimiento < ?3)
        ORDER BY fecha_vencimiento ASC, id ASC
        "#,
        SERVICE_COLUMNS
    ))?;

    let services = stmt
        .query_map(params![owner_id, start, end], row_to_service)?
        .collect::<Result<Vec<_>>>()?;
    Ok(services)
}

/// Flip every unpaid service due before `now` to overdue in one statement.
/// Returns the number of services promoted.
pub fn mark_overdue(
    conn: &Connection,
    owner_id: i64,
    window: &DueWindow,
    now: DateTime<Utc>,
) -> Result<usize> {
    let (start, end) = window.bounds();
    let now = to_db_string(now);
    conn.execute(
        r#"
        UPDATE servicios
        SET estado = ?1, updated_at = ?2
        WHERE usuario_id = ?3
          AND estado NOT IN (?4, ?1)
          AND fecha_vencimiento < ?2
          AND (?5 IS NULL OR fecha_vencimiento >= ?5)
          AND (?6 IS NULL OR fecha_vencimiento < ?6)
        "#,
        params![
            ServiceStatus::Overdue.as_str(),
            now,
            owner_id,
            ServiceStatus::Paid.as_str(),
            start,
            end,
        ],
    )
}

/// Persist every mutable field of `service`
pub fn update_service(conn: &Connection, service: &Service, now: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        r#"
        UPDATE servicios
        SET nombre = ?1, monto = ?2, fecha_vencimiento = ?3, recurrencia = ?4, estado = ?5,
            link_pago = ?6, categoria = ?7, updated_at = ?8
        WHERE id = ?9 AND usuario_id = ?10
        "#,
        params![
            service.name,
            service.amount,
            to_db_string(service.due_date),
            service.recurrence.as_str(),
            service.status.as_str(),
            service.payment_link,
            service.category,
            to_db_string(now),
            service.id,
            service.owner_id,
        ],
    )
}

pub fn set_status(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    status: ServiceStatus,
    now: DateTime<Utc>,
) -> Result<usize> {
    conn.execute(
        "UPDATE servicios SET estado = ?1, updated_at = ?2 WHERE id = ?3 AND usuario_id = ?4",
        params![status.as_str(), to_db_string(now), id, owner_id],
    )
}

pub fn delete_service(conn: &Connection, owner_id: i64, id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM servicios WHERE id = ?1 AND usuario_id = ?2",
        params![id, owner_id],
    )
}

#[cfg(test)]
pub fn count_services(conn: &Connection, owner_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM servicios WHERE usuario_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )
}

fn row_to_service(row: &Row) -> Result<Service> {
    let due_raw: String = row.get(3)?;
    let due_date = from_db_string(&due_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("invalid fecha_vencimiento '{}'", due_raw).into(),
        )
    })?;

    let status_raw: String = row.get(5)?;
    let status = ServiceStatus::from_str(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("invalid estado '{}'", status_raw).into(),
        )
    })?;

    let recurrence: String = row.get(4)?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        due_date,
        recurrence: Recurrence::from_str(&recurrence),
        status,
        payment_link: row.get(6)?,
        category: row.get(7)?,
        owner_id: row.get(8)?,
    })
}
