//! Payment status events.
//!
//! Reconciliation notifies interested parties (the POS screen waiting on a QR scan, mostly)
//! whenever a sale's payment status actually changes. Subscriptions are scoped to a single sale
//! id; there is no global firehose. No-op reconciliations deliberately produce no event.

mod event_types;
mod subscribers;

pub use event_types::PaymentStatusEvent;
pub use subscribers::SaleSubscriptions;
