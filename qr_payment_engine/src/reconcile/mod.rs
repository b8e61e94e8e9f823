//! The reconciliation flow.
//!
//! [`WebhookFlowApi`] is the single entry point for provider notifications once the HTTP layer
//! has flattened them into a [`crate::webhook::WebhookRequest`]. It owns the idempotency check,
//! the payment and merchant-order branches, the status state machine and the retry chains for
//! merchant orders that arrive before their payment exists.

mod correlate;
mod flow_api;
mod retry;
mod status;

pub use correlate::{correlate_sale, CorrelationKeys};
pub use flow_api::{WebhookFlowApi, WebhookFlowError, WebhookOutcome, PROVIDER_TAG};
pub use retry::RetryConfig;
pub use status::{map_provider_status, MappedStatus};
