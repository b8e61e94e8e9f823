//! # Backend and collaborator contracts.
//!
//! This module defines the interface contracts between the reconciliation flow and the outside
//! world.
//!
//! ## Persistence
//! The [`ReconciliationDatabase`] trait is everything the flow needs from a datastore: sale
//! lookups by the three correlation keys, the single-row sale update, and the idempotency
//! ledger's `record_webhook_event_if_new`. The SQLite backend in [`crate::sqlite`] implements it;
//! tests implement it with mocks.
//!
//! ## Provider queries
//! The [`ProviderApi`] trait covers the three read endpoints reconciliation depends on: fetch a
//! payment, fetch a merchant order, search payments by external reference. The production
//! implementation wraps [`mercado_tools::MercadoApi`]; its error vocabulary is reduced to the
//! three cases the flow distinguishes (not found, timeout, upstream failure).

mod data_objects;
mod provider;
mod reconciliation_database;

pub use data_objects::SalePaymentUpdate;
pub use provider::{ProviderApi, ProviderApiError};
pub use reconciliation_database::{ReconciliationDatabase, SaleApiError};
