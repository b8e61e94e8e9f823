use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{NewSale, Sale, SaleId, WebhookTopic},
    traits::SalePaymentUpdate,
};

/// The persistence contract the reconciliation flow runs against.
///
/// Implementations must be cheap to clone (the retry scheduler clones the backend into spawned
/// tasks) and safe under concurrent callers: the ledger insert relies on a genuine uniqueness
/// guarantee, and `update_sale_payment` must apply all fields in one atomic single-row write.
#[async_trait]
pub trait ReconciliationDatabase: Clone + Send + Sync {
    /// Fetches the sale with the given id, or `None` if it does not exist.
    async fn fetch_sale(&self, id: &SaleId) -> Result<Option<Sale>, SaleApiError>;

    /// Fetches the sale previously linked to the given provider merchant-order id, if any.
    async fn fetch_sale_by_order_id(&self, provider_order_id: &str) -> Result<Option<Sale>, SaleApiError>;

    /// Fetches the sale previously linked to the given provider payment id, if any.
    async fn fetch_sale_by_payment_id(&self, provider_payment_id: &str) -> Result<Option<Sale>, SaleApiError>;

    /// Creates a new Pending sale. Fails with [`SaleApiError::SaleAlreadyExists`] on id reuse.
    async fn insert_sale(&self, sale: NewSale) -> Result<Sale, SaleApiError>;

    /// Applies the given update to the sale in a single atomic write and returns the updated
    /// record. Fails with [`SaleApiError::SaleNotFound`] if the sale does not exist.
    async fn update_sale_payment(&self, id: &SaleId, update: SalePaymentUpdate) -> Result<Sale, SaleApiError>;

    /// The idempotency ledger. Returns `true` if this is the first sighting of the
    /// (provider, topic, resource id) tuple and processing should continue; `false` if the tuple
    /// was recorded before. Duplicates are expected under the provider's at-least-once delivery
    /// and must be cheap, not errors. Any failure other than the uniqueness violation propagates.
    async fn record_webhook_event_if_new(
        &self,
        provider: &str,
        topic: WebhookTopic,
        resource_id: &str,
    ) -> Result<bool, SaleApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum SaleApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Sale {0} does not exist")]
    SaleNotFound(SaleId),
    #[error("Sale {0} already exists")]
    SaleAlreadyExists(SaleId),
}

impl From<sqlx::Error> for SaleApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
