pub mod dates;
pub mod service;
pub mod transaction;

pub use service::{
  FieldError, NewService, PatchedService, Recurrence, Service, ServiceDraft, ServicePatch,
  ServiceStatus,
};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
