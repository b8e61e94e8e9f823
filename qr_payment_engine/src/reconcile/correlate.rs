//! Correlates provider-side identifiers back to a local sale.

use log::*;

use crate::{
    db_types::{Sale, SaleId},
    traits::{ReconciliationDatabase, SaleApiError},
};

/// The provider-side identifiers an event may carry, in decreasing order of trust. An external
/// reference is authoritative because we minted it; the merchant-order and payment ids are only
/// known once a previous reconciliation stored them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationKeys {
    pub external_reference: Option<String>,
    pub merchant_order_id: Option<String>,
    pub payment_id: Option<String>,
}

impl CorrelationKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_external_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_merchant_order_id<S: Into<String>>(mut self, order_id: S) -> Self {
        self.merchant_order_id = Some(order_id.into());
        self
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }
}

/// Resolves a local sale from whatever keys the event carries, trying in order:
///
/// 1. the external reference, with the sale prefix stripped, as a direct id lookup;
/// 2. the stored merchant-order id linkage;
/// 3. the stored payment id linkage.
///
/// The first hit wins. A miss on one key falls through to the next, so a mangled external
/// reference can still correlate through an earlier linkage. `None` means no sale matches at
/// all, which callers treat as benign.
pub async fn correlate_sale<B: ReconciliationDatabase>(
    db: &B,
    keys: &CorrelationKeys,
) -> Result<Option<Sale>, SaleApiError> {
    if let Some(reference) = keys.external_reference.as_deref() {
        match SaleId::from_external_reference(reference) {
            Some(id) => {
                if let Some(sale) = db.fetch_sale(&id).await? {
                    trace!("🔄️ Correlated sale {} via external reference", sale.id);
                    return Ok(Some(sale));
                }
            },
            None => debug!("🔄️ External reference '{reference}' does not carry the sale prefix. Skipping."),
        }
    }
    if let Some(order_id) = keys.merchant_order_id.as_deref() {
        if let Some(sale) = db.fetch_sale_by_order_id(order_id).await? {
            trace!("🔄️ Correlated sale {} via merchant order {order_id}", sale.id);
            return Ok(Some(sale));
        }
    }
    if let Some(payment_id) = keys.payment_id.as_deref() {
        if let Some(sale) = db.fetch_sale_by_payment_id(payment_id).await? {
            trace!("🔄️ Correlated sale {} via payment {payment_id}", sale.id);
            return Ok(Some(sale));
        }
    }
    Ok(None)
}
