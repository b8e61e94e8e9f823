//! # QPG server
//!
//! The HTTP face of the QR payment gateway. It is responsible for:
//! * receiving webhook notifications from the payment provider, enforcing the signature policy,
//!   and handing them to the reconciliation engine;
//! * letting the point of sale create sales and poll or stream their payment status.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `GET /health`: liveness check.
//! * `POST /wh/payments`: the provider webhook endpoint. Always returns 200 for deliveries that
//!   were received and understood, whatever reconciliation concluded; 401 when strict signature
//!   checking rejects the delivery; 502 when the provider's query API failed transiently and the
//!   delivery should be retried.
//! * `POST /sales`: create a sale before presenting the QR code.
//! * `GET /sales/{id}`: fetch a sale's current state.
//! * `GET /sales/{id}/events`: stream payment status changes for one sale as server-sent events.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
