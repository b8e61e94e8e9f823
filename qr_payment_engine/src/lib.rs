//! QR Payment Engine
//!
//! The reconciliation core of the QR payment gateway. The point of sale creates a sale record,
//! hands the buyer a QR code, and from then on everything this library does is driven by the
//! payment provider's webhook notifications: verifying that a notification is authentic,
//! working out which provider resource it refers to, discarding duplicates, fetching the
//! authoritative payment state, correlating it back to exactly one local sale, and walking that
//! sale's payment state machine to a terminal status exactly once.
//!
//! The library is divided into four main sections:
//! 1. Database management ([`mod@sqlite`]). The SQLite backend implements the persistence traits;
//!    you should never need to touch it directly. The shared data types live in [`mod@db_types`].
//! 2. Webhook plumbing ([`mod@webhook`]): signature verification and resource identity
//!    resolution over a plain `{headers, query, body}` value struct, so nothing below the HTTP
//!    layer depends on a web framework.
//! 3. The reconciliation flow ([`mod@reconcile`]): status mapping, sale correlation, the
//!    [`WebhookFlowApi`] orchestrator and the merchant-order retry scheduler.
//! 4. Events ([`mod@events`]): a per-sale subscription registry. Whenever a sale's payment status
//!    actually changes, everyone listening on that sale id is told about it.
//!
//! Backends and providers are abstracted behind the traits in [`mod@traits`], so tests (and any
//! future second provider) can swap in their own implementations.

pub mod db_types;
pub mod events;
pub mod reconcile;
pub mod traits;
pub mod webhook;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use reconcile::{RetryConfig, WebhookFlowApi, WebhookFlowError, WebhookOutcome};
pub use webhook::WebhookRequest;
