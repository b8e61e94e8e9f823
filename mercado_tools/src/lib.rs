//! A thin client for the MercadoPago query API.
//!
//! This crate only covers the read-side endpoints the payment gateway needs to reconcile QR
//! payments: fetching a payment, fetching a merchant order, and searching payments by external
//! reference. Charge creation, refunds and the rest of the provider surface are deliberately
//! absent.

mod api;
mod config;
mod data_objects;
mod error;

pub use api::MercadoApi;
pub use config::MercadoConfig;
pub use data_objects::{MerchantOrderDetail, MerchantOrderPayment, OrderLink, Paging, PaymentDetail, PaymentSearchResults};
pub use error::MercadoApiError;
