//! Service lifecycle: listing with auto-expiry, creation with monthly
//! expansion, updates, status changes with payment side effects, deletion.
//!
//! Every operation takes `now` explicitly; handlers pass the wall clock.
//! Multi-row writes run inside one SQLite transaction.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;

use super::ServiceError;
use crate::config::MONTHLY_OCCURRENCES;
use crate::db::services::{self as service_db, DueWindow};
use crate::db::transactions as transaction_db;
use crate::domain::dates::{self, month_window, year_window};
use crate::domain::transaction::payment_description;
use crate::domain::{
  FieldError, NewTransaction, Service, ServiceDraft, ServicePatch, ServiceStatus,
};

/// Month/year filter for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
  pub month: Option<u32>,
  pub year: Option<i32>,
}

impl ListFilter {
  /// Resolve into a due-date window. A month without a year uses the
  /// year of `now`; a year alone covers the whole year.
  pub fn window(&self, now: DateTime<Utc>) -> Result<DueWindow, FieldError> {
    let bounds = match (self.month, self.year) {
      (None, None) => return Ok(DueWindow::default()),
      (Some(month), year) => {
        if !(1..=12).contains(&month) {
          return Err(FieldError::Invalid {
            field: "mes",
            reason: format!("{} is not a month (1-12)", month),
          });
        }
        month_window(year.unwrap_or_else(|| now.year()), month)
      }
      (None, Some(year)) => year_window(year),
    };

    bounds
      .map(|(start, end)| DueWindow::between(start, end))
      .ok_or_else(|| FieldError::Invalid {
        field: "anio",
        reason: "year out of range".to_string(),
      })
  }
}

/// List an owner's services, promoting unpaid past-due ones to overdue first.
pub fn list_services(
  conn: &Connection,
  owner_id: i64,
  filter: &ListFilter,
  now: DateTime<Utc>,
) -> Result<Vec<Service>, ServiceError> {
  let window = filter.window(now)?;

  let promoted = service_db::mark_overdue(conn, owner_id, &window, now)?;
  if promoted > 0 {
    tracing::debug!("Marked {} service(s) overdue for user {}", promoted, owner_id);
  }

  Ok(service_db::list_services(conn, owner_id, &window)?)
}

/// Create a service. Monthly services expand into a 12-month series.
///
/// Returns the base service.
pub fn create_service(
  conn: &Connection,
  owner_id: i64,
  draft: ServiceDraft,
  now: DateTime<Utc>,
) -> Result<Service, ServiceError> {
  let new = draft.validate()?;

  let tx = conn.unchecked_transaction()?;
  let id = service_db::insert_service(&tx, owner_id, &new, now)?;

  let mut generated = 0;
  if new.recurrence.is_monthly() {
    for due_date in dates::monthly_series(new.due_date, MONTHLY_OCCURRENCES)
      .into_iter()
      .skip(1)
    {
      service_db::insert_service(&tx, owner_id, &new.occurrence_on(due_date), now)?;
      generated += 1;
    }
  }

  let service = service_db::get_service(&tx, owner_id, id)?.ok_or(ServiceError::NotFound(id))?;
  if service.status.is_paid() {
    record_payment(&tx, &service, now)?;
  }
  tx.commit()?;

  tracing::info!(
    "Created service {} '{}' for user {} ({} future occurrence(s))",
    service.id,
    service.name,
    owner_id,
    generated
  );
  Ok(service)
}

/// Partial update. A status supplied in the patch, or implied by moving an
/// overdue due date forward, goes through the payment side effects.
pub fn update_service(
  conn: &Connection,
  owner_id: i64,
  id: i64,
  patch: ServicePatch,
  now: DateTime<Utc>,
) -> Result<Service, ServiceError> {
  let tx = conn.unchecked_transaction()?;
  let current = service_db::get_service(&tx, owner_id, id)?.ok_or(ServiceError::NotFound(id))?;

  if patch.is_empty() {
    return Ok(current);
  }

  let patched = patch.apply(&current, now)?;
  service_db::update_service(&tx, &patched.service, now)?;

  if patched.requested_status.is_some() || patched.service.status != current.status {
    sync_payment(&tx, &current, &patched.service, now)?;
  }
  tx.commit()?;

  Ok(patched.service)
}

/// Set a service's status, creating or removing its payment expense.
pub fn change_status(
  conn: &Connection,
  owner_id: i64,
  id: i64,
  status: ServiceStatus,
  now: DateTime<Utc>,
) -> Result<Service, ServiceError> {
  let tx = conn.unchecked_transaction()?;
  let current = service_db::get_service(&tx, owner_id, id)?.ok_or(ServiceError::NotFound(id))?;

  service_db::set_status(&tx, owner_id, id, status, now)?;
  let updated = Service {
    status,
    ..current.clone()
  };
  sync_payment(&tx, &current, &updated, now)?;
  tx.commit()?;

  tracing::debug!(
    "Service {} status {} -> {}",
    id,
    current.status.as_str(),
    status.as_str()
  );
  Ok(updated)
}

/// Delete a service and the transactions linked to it.
pub fn delete_service(conn: &Connection, owner_id: i64, id: i64) -> Result<(), ServiceError> {
  let tx = conn.unchecked_transaction()?;
  if service_db::get_service(&tx, owner_id, id)?.is_none() {
    return Err(ServiceError::NotFound(id));
  }

  let removed = transaction_db::delete_for_service(&tx, owner_id, id)?;
  service_db::delete_service(&tx, owner_id, id)?;
  tx.commit()?;

  tracing::info!("Deleted service {} and {} linked transaction(s)", id, removed);
  Ok(())
}

/// Bring the payment expense in line with `updated.status`.
///
/// A linked expense always counts as the payment. On removal `previous` is
/// also consulted so an expense recorded under the old name or due month
/// is still found after an edit.
fn sync_payment(
  conn: &Connection,
  previous: &Service,
  updated: &Service,
  now: DateTime<Utc>,
) -> rusqlite::Result<()> {
  if updated.status.is_paid() {
    record_payment(conn, updated, now)
  } else {
    let mut removed =
      transaction_db::delete_payments(conn, updated.owner_id, updated.id, &payment_description(updated))?;
    if payment_description(previous) != payment_description(updated) {
      removed += transaction_db::delete_payments(
        conn,
        previous.owner_id,
        previous.id,
        &payment_description(previous),
      )?;
    }
    if removed > 0 {
      tracing::debug!("Removed {} payment(s) for service {}", removed, updated.id);
    }
    Ok(())
  }
}

/// Record the payment expense for a paid service unless one exists.
/// An unlinked expense with the payment description is adopted instead.
fn record_payment(conn: &Connection, service: &Service, now: DateTime<Utc>) -> rusqlite::Result<()> {
  let description = payment_description(service);
  match transaction_db::find_payment(conn, service.owner_id, service.id, &description)? {
    Some(existing) if existing.service_id.is_some() => Ok(()),
    Some(existing) => {
      transaction_db::link_to_service(conn, existing.id, service.id)?;
      tracing::debug!("Linked transaction {} to service {}", existing.id, service.id);
      Ok(())
    }
    None => {
      let id = transaction_db::insert_transaction(conn, &NewTransaction::payment_for(service, now), now)?;
      tracing::debug!("Recorded payment transaction {} for service {}", id, service.id);
      Ok(())
    }
  }
}
