use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::dates;

/// Lifecycle status of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
  #[serde(rename = "pendiente", alias = "pending")]
  Pending,
  #[serde(rename = "pagado", alias = "paid")]
  Paid,
  #[serde(rename = "vencido", alias = "overdue")]
  Overdue,
}

impl ServiceStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "pendiente" | "pending" => Some(Self::Pending),
      "pagado" | "paid" => Some(Self::Paid),
      "vencido" | "overdue" => Some(Self::Overdue),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pendiente",
      Self::Paid => "pagado",
      Self::Overdue => "vencido",
    }
  }

  pub fn is_paid(&self) -> bool {
    matches!(self, Self::Paid)
  }
}

/// How often a service repeats.
///
/// Only monthly recurrence drives behavior; other labels are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recurrence {
  Monthly,
  #[default]
  Once,
  Other(String),
}

impl Recurrence {
  pub fn from_str(s: &str) -> Self {
    let normalized = s.trim().to_lowercase();
    match normalized.as_str() {
      "mensual" | "monthly" => Self::Monthly,
      "" | "unico" | "único" | "unica" | "única" | "once" | "none" | "ninguna" => Self::Once,
      _ => Self::Other(normalized),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Monthly => "mensual",
      Self::Once => "unico",
      Self::Other(label) => label,
    }
  }

  pub fn is_monthly(&self) -> bool {
    matches!(self, Self::Monthly)
  }
}

impl From<String> for Recurrence {
  fn from(s: String) -> Self {
    Self::from_str(&s)
  }
}

impl From<Recurrence> for String {
  fn from(r: Recurrence) -> Self {
    r.as_str().to_string()
  }
}

/// A recurring bill or subscription owned by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
  pub id: i64,
  #[serde(rename = "nombre")]
  pub name: String,
  #[serde(rename = "monto")]
  pub amount: f64,
  #[serde(rename = "fecha_vencimiento")]
  pub due_date: DateTime<Utc>,
  #[serde(rename = "recurrencia")]
  pub recurrence: Recurrence,
  #[serde(rename = "estado")]
  pub status: ServiceStatus,
  #[serde(rename = "link_pago")]
  pub payment_link: Option<String>,
  #[serde(rename = "categoria")]
  pub category: Option<String>,
  #[serde(rename = "usuario_id")]
  pub owner_id: i64,
}

/// Validated fields for a service about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewService {
  pub name: String,
  pub amount: f64,
  pub due_date: DateTime<Utc>,
  pub recurrence: Recurrence,
  pub status: ServiceStatus,
  pub payment_link: Option<String>,
  pub category: Option<String>,
}

impl NewService {
  /// Copy of this service due on another date, always pending
  pub fn occurrence_on(&self, due_date: DateTime<Utc>) -> Self {
    Self {
      due_date,
      status: ServiceStatus::Pending,
      ..self.clone()
    }
  }
}

/// A request field that is missing or malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
  #[error("missing required field: {0}")]
  Missing(&'static str),
  #[error("invalid {field}: {reason}")]
  Invalid { field: &'static str, reason: String },
}

impl FieldError {
  fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid {
      field,
      reason: reason.into(),
    }
  }
}

/// Unvalidated body of a create request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDraft {
  #[serde(default, rename = "nombre")]
  pub name: Option<String>,
  #[serde(default, rename = "monto", deserialize_with = "amount_input")]
  pub amount: Option<f64>,
  #[serde(default, rename = "fecha_vencimiento")]
  pub due_date: Option<String>,
  #[serde(default, rename = "recurrencia")]
  pub recurrence: Option<String>,
  #[serde(default, rename = "estado")]
  pub status: Option<String>,
  #[serde(default, rename = "link_pago")]
  pub payment_link: Option<String>,
  #[serde(default, rename = "categoria")]
  pub category: Option<String>,
}

impl ServiceDraft {
  pub fn validate(self) -> Result<NewService, FieldError> {
    let name = validate_name(self.name.ok_or(FieldError::Missing("nombre"))?)?;
    let amount = validate_amount(self.amount.ok_or(FieldError::Missing("monto"))?)?;
    let due_date = validate_due_date(
      self
        .due_date
        .as_deref()
        .ok_or(FieldError::Missing("fecha_vencimiento"))?,
    )?;
    let status = match self.status.as_deref() {
      Some(s) => validate_status(s)?,
      None => ServiceStatus::Pending,
    };

    Ok(NewService {
      name,
      amount,
      due_date,
      recurrence: self
        .recurrence
        .as_deref()
        .map(Recurrence::from_str)
        .unwrap_or_default(),
      status,
      payment_link: non_blank(self.payment_link),
      category: non_blank(self.category),
    })
  }
}

/// Partial update body; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
  #[serde(default, rename = "nombre")]
  pub name: Option<String>,
  #[serde(default, rename = "monto", deserialize_with = "amount_input")]
  pub amount: Option<f64>,
  #[serde(default, rename = "fecha_vencimiento")]
  pub due_date: Option<String>,
  #[serde(default, rename = "recurrencia")]
  pub recurrence: Option<String>,
  #[serde(default, rename = "estado")]
  pub status: Option<String>,
  #[serde(default, rename = "link_pago")]
  pub payment_link: Option<String>,
  #[serde(default, rename = "categoria")]
  pub category: Option<String>,
}

/// Outcome of applying a patch
#[derive(Debug, Clone, PartialEq)]
pub struct PatchedService {
  pub service: Service,
  /// Status explicitly requested by the patch, if any
  pub requested_status: Option<ServiceStatus>,
}

impl ServicePatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.amount.is_none()
      && self.due_date.is_none()
      && self.recurrence.is_none()
      && self.status.is_none()
      && self.payment_link.is_none()
      && self.category.is_none()
  }

  /// Apply the patch on top of `current`, validating every supplied field.
  ///
  /// An overdue service whose due date moves past `now` is pending again
  /// unless the patch names a status itself.
  pub fn apply(
    self,
    current: &Service,
    now: DateTime<Utc>,
  ) -> Result<PatchedService, FieldError> {
    let mut service = current.clone();

    if let Some(name) = self.name {
      service.name = validate_name(name)?;
    }
    if let Some(amount) = self.amount {
      service.amount = validate_amount(amount)?;
    }
    if let Some(raw) = self.due_date.as_deref() {
      service.due_date = validate_due_date(raw)?;
    }
    if let Some(raw) = self.recurrence.as_deref() {
      service.recurrence = Recurrence::from_str(raw);
    }
    if let Some(link) = self.payment_link {
      service.payment_link = non_blank(Some(link));
    }
    if let Some(category) = self.category {
      service.category = non_blank(Some(category));
    }

    let requested_status = match self.status.as_deref() {
      Some(raw) => Some(validate_status(raw)?),
      None => None,
    };

    match requested_status {
      Some(status) => service.status = status,
      None => {
        if service.status == ServiceStatus::Overdue && service.due_date > now {
          service.status = ServiceStatus::Pending;
        }
      }
    }

    Ok(PatchedService {
      service,
      requested_status,
    })
  }
}

/// Parse a status field, rejecting unknown values
pub fn validate_status(raw: &str) -> Result<ServiceStatus, FieldError> {
  ServiceStatus::from_str(raw)
    .ok_or_else(|| FieldError::invalid("estado", format!("unknown status '{}'", raw.trim())))
}

fn validate_name(name: String) -> Result<String, FieldError> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(FieldError::Missing("nombre"));
  }
  Ok(trimmed.to_string())
}

fn validate_amount(amount: f64) -> Result<f64, FieldError> {
  if !amount.is_finite() {
    return Err(FieldError::invalid("monto", "must be a finite number"));
  }
  if amount < 0.0 {
    return Err(FieldError::invalid("monto", "must not be negative"));
  }
  Ok(amount)
}

fn validate_due_date(raw: &str) -> Result<DateTime<Utc>, FieldError> {
  if raw.trim().is_empty() {
    return Err(FieldError::Missing("fecha_vencimiento"));
  }
  dates::parse_due_date(raw).ok_or_else(|| {
    FieldError::invalid("fecha_vencimiento", format!("unrecognized date '{}'", raw.trim()))
  })
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

/// Amounts arrive as JSON numbers or numeric strings (form inputs).
/// A non-numeric string becomes NaN and fails validation as a 400.
fn amount_input<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum AmountInput {
    Number(f64),
    Text(String),
  }

  Ok(match Option::<AmountInput>::deserialize(deserializer)? {
    None => None,
    Some(AmountInput::Number(n)) => Some(n),
    Some(AmountInput::Text(s)) if s.trim().is_empty() => None,
    Some(AmountInput::Text(s)) => Some(s.trim().replace(',', ".").parse().unwrap_or(f64::NAN)),
  })
}
