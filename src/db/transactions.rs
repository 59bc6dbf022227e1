//! `transacciones` table access for service payments.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::dates::{from_db_string, to_db_string};
use crate::domain::{NewTransaction, Transaction, TransactionKind};

const TRANSACTION_COLUMNS: &str =
    "id, tipo, monto, descripcion, categoria, fecha, recurrente, usuario_id, servicio_id";

pub fn insert_transaction(
    conn: &Connection,
    tx: &NewTransaction,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO transacciones (usuario_id, tipo, monto, descripcion, categoria, fecha,
                                   recurrente, servicio_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            tx.owner_id,
            tx.kind.as_str(),
            tx.amount,
            tx.description,
            tx.category,
            to_db_string(tx.date),
            tx.recurring,
            tx.service_id,
            to_db_string(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Find the expense recording a service's payment.
///
/// Matches on the service link first, then on an unlinked expense of the
/// same owner carrying the payment description.
pub fn find_payment(
    conn: &Connection,
    owner_id: i64,
    service_id: i64,
    description: &str,
) -> Result<Option<Transaction>> {
    conn.query_row(
        &format!(
            r#"
            SELECT {}
            FROM transacciones
            WHERE usuario_id = ?1
              AND tipo = ?2
              AND (servicio_id = ?3 OR (servicio_id IS NULL AND descripcion = ?4))
            ORDER BY (servicio_id IS NULL) ASC, id ASC
            LIMIT 1
            "#,
            TRANSACTION_COLUMNS
        ),
        params![owner_id, TransactionKind::Expense.as_str(), service_id, description],
        row_to_transaction,
    )
    .optional()
}

/// Attach an existing transaction to a service
pub fn link_to_service(conn: &Connection, id: i64, service_id: i64) -> Result<usize> {
    conn.execute(
        "UPDATE transacciones SET servicio_id = ?1 WHERE id = ?2",
        params![service_id, id],
    )
}

/// Delete every expense matched by [`find_payment`]'s rules.
/// Returns the number of rows removed.
pub fn delete_payments(
    conn: &Connection,
    owner_id: i64,
    service_id: i64,
    description: &str,
) -> Result<usize> {
    conn.execute(
        r#"
        DELETE FROM transacciones
        WHERE usuario_id = ?1
          AND tipo = ?2
          AND (servicio_id = ?3 OR (servicio_id IS NULL AND descripcion = ?4))
        "#,
        params![owner_id, TransactionKind::Expense.as_str(), service_id, description],
    )
}

/// Delete all transactions linked to a service (delete cascade)
pub fn delete_for_service(conn: &Connection, owner_id: i64, service_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM transacciones WHERE usuario_id = ?1 AND servicio_id = ?2",
        params![owner_id, service_id],
    )
}

#[cfg(test)]
pub fn list_for_service(
    conn: &Connection,
    owner_id: i64,
    service_id: i64,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transacciones WHERE usuario_id = ?1 AND servicio_id = ?2 ORDER BY id",
        TRANSACTION_COLUMNS
    ))?;
    let transactions = stmt
        .query_map(params![owner_id, service_id], row_to_transaction)?
        .collect::<Result<Vec<_>>>()?;
    Ok(transactions)
}

pub fn count_transactions(conn: &Connection, owner_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM transacciones WHERE usuario_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )
}

fn row_to_transaction(row: &Row) -> Result<Transaction> {
    let kind_raw: String = row.get(1)?;
    let kind = TransactionKind::from_str(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("invalid tipo '{}'", kind_raw).into(),
        )
    })?;

    let date_raw: String = row.get(5)?;
    let date = from_db_string(&date_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("invalid fecha '{}'", date_raw).into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        kind,
        amount: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        date,
        recurring: row.get(6)?,
        owner_id: row.get(7)?,
        service_id: row.get(8)?,
    })
}
