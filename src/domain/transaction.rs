use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dates;
use super::service::Service;
use crate::config::DEFAULT_PAYMENT_CATEGORY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
  #[serde(rename = "gasto")]
  Expense,
  #[serde(rename = "ingreso")]
  Income,
}

impl TransactionKind {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "gasto" | "expense" => Some(Self::Expense),
      "ingreso" | "income" => Some(Self::Income),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Expense => "gasto",
      Self::Income => "ingreso",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
  pub id: i64,
  #[serde(rename = "tipo")]
  pub kind: TransactionKind,
  #[serde(rename = "monto")]
  pub amount: f64,
  #[serde(rename = "descripcion")]
  pub description: String,
  #[serde(rename = "categoria")]
  pub category: Option<String>,
  #[serde(rename = "fecha")]
  pub date: DateTime<Utc>,
  #[serde(rename = "recurrente")]
  pub recurring: bool,
  #[serde(rename = "usuario_id")]
  pub owner_id: i64,
  /// Service whose payment this transaction records
  #[serde(rename = "servicio_id")]
  pub service_id: Option<i64>,
}

/// Fields for a transaction about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
  pub kind: TransactionKind,
  pub amount: f64,
  pub description: String,
  pub category: Option<String>,
  pub date: DateTime<Utc>,
  pub recurring: bool,
  pub owner_id: i64,
  pub service_id: Option<i64>,
}

impl NewTransaction {
  /// Expense recording the payment of `service`, dated at `paid_at`
  pub fn payment_for(service: &Service, paid_at: DateTime<Utc>) -> Self {
    Self {
      kind: TransactionKind::Expense,
      amount: service.amount,
      description: payment_description(service),
      category: Some(
        service
          .category
          .clone()
          .unwrap_or_else(|| DEFAULT_PAYMENT_CATEGORY.to_string()),
      ),
      date: paid_at,
      recurring: service.recurrence.is_monthly(),
      owner_id: service.owner_id,
      service_id: Some(service.id),
    }
  }
}

/// Description of the expense recorded when a service is paid.
///
/// Includes the due month so that occurrences of one monthly series never
/// share a description.
pub fn payment_description(service: &Service) -> String {
  format!("Pago de {} ({})", service.name, dates::month_label(service.due_date))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Recurrence, ServiceStatus};
  use chrono::TimeZone;

  fn service(category: Option<&str>, recurrence: Recurrence) -> Service {
    Service {
      id: 3,
      name: "Agua".to_string(),
      amount: 12.5,
      due_date: Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
      recurrence,
      status: ServiceStatus::Paid,
      payment_link: None,
      category: category.map(String::from),
      owner_id: 9,
    }
  }

  #[test]
  fn test_payment_for_copies_service_fields() {
    let paid_at = Utc.with_ymd_and_hms(2024, 5, 18, 9, 30, 0).unwrap();
    let tx = NewTransaction::payment_for(&service(Some("Hogar"), Recurrence::Monthly), paid_at);

    assert_eq!(tx.kind, TransactionKind::Expense);
    assert!((tx.amount - 12.5).abs() < f64::EPSILON);
    assert_eq!(tx.description, "Pago de Agua (2024-05)");
    assert_eq!(tx.category.as_deref(), Some("Hogar"));
    assert_eq!(tx.date, paid_at);
    assert!(tx.recurring);
    assert_eq!(tx.owner_id, 9);
    assert_eq!(tx.service_id, Some(3));
  }

  #[test]
  fn test_payment_for_defaults_category() {
    let tx = NewTransaction::payment_for(&service(None, Recurrence::Once), Utc::now());
    assert_eq!(tx.category.as_deref(), Some(DEFAULT_PAYMENT_CATEGORY));
    assert!(!tx.recurring);
  }

  #[test]
  fn test_kind_roundtrip() {
    assert_eq!(TransactionKind::from_str("gasto"), Some(TransactionKind::Expense));
    assert_eq!(TransactionKind::from_str("income"), Some(TransactionKind::Income));
    assert_eq!(TransactionKind::from_str("transfer"), None);
    assert_eq!(TransactionKind::Expense.as_str(), "gasto");
  }
}
