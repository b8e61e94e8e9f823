//! Webhook plumbing.
//!
//! Everything in here works on [`WebhookRequest`], a plain `{headers, query, body}` value struct,
//! so signature verification and identity resolution can be exercised without an HTTP framework
//! in sight. The server layer's only job is to flatten the real request into this shape.

mod request;
pub mod resource;
pub mod signature;

pub use request::{WebhookRequest, REQUEST_ID_HEADER, SIGNATURE_HEADER};
