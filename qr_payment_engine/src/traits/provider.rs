use async_trait::async_trait;
use mercado_tools::{MercadoApi, MercadoApiError, MerchantOrderDetail, PaymentDetail};
use thiserror::Error;

/// The provider query surface the reconciliation flow consumes. Three read endpoints, nothing
/// more; charge creation happens at the point of sale and is not this library's business.
#[async_trait]
pub trait ProviderApi: Clone + Send + Sync {
    /// Fetches the authoritative state of a payment by its provider id.
    async fn payment(&self, payment_id: &str) -> Result<PaymentDetail, ProviderApiError>;

    /// Fetches a merchant order, including its embedded payment attempts.
    async fn merchant_order(&self, order_id: &str) -> Result<MerchantOrderDetail, ProviderApiError>;

    /// Searches the provider for payments carrying the given external reference.
    async fn search_payments_by_reference(&self, external_reference: &str)
        -> Result<Vec<PaymentDetail>, ProviderApiError>;
}

/// The three failure cases the flow distinguishes. `NotFound` is benign (the resource has not
/// propagated to the provider's query APIs yet); the other two are transient and propagate so the
/// transport layer can let the provider redeliver.
#[derive(Debug, Clone, Error)]
pub enum ProviderApiError {
    #[error("The provider has no record of {0}")]
    NotFound(String),
    #[error("The provider query timed out: {0}")]
    Timeout(String),
    #[error("Provider query failed: {0}")]
    Upstream(String),
}

impl ProviderApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<MercadoApiError> for ProviderApiError {
    fn from(e: MercadoApiError) -> Self {
        match e {
            MercadoApiError::NotFound(what) => Self::NotFound(what),
            MercadoApiError::Timeout(what) => Self::Timeout(what),
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[async_trait]
impl ProviderApi for MercadoApi {
    async fn payment(&self, payment_id: &str) -> Result<PaymentDetail, ProviderApiError> {
        Ok(self.get_payment(payment_id).await?)
    }

    async fn merchant_order(&self, order_id: &str) -> Result<MerchantOrderDetail, ProviderApiError> {
        Ok(self.get_merchant_order(order_id).await?)
    }

    async fn search_payments_by_reference(
        &self,
        external_reference: &str,
    ) -> Result<Vec<PaymentDetail>, ProviderApiError> {
        Ok(self.search_payments_by_external_reference(external_reference).await?)
    }
}
