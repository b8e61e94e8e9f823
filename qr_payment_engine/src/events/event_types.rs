use serde::{Deserialize, Serialize};

use crate::db_types::{PaymentStatus, Sale, SaleId, SaleStatus};

/// Emitted after a reconciliation writes a new payment status for a sale. Carries the provider's
/// raw vocabulary alongside the mapped statuses so consumers can show either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusEvent {
    pub sale_id: SaleId,
    pub payment_status: PaymentStatus,
    pub sale_status: SaleStatus,
    pub provider_status: Option<String>,
    pub provider_status_detail: Option<String>,
}

impl PaymentStatusEvent {
    pub fn from_sale(sale: &Sale) -> Self {
        Self {
            sale_id: sale.id.clone(),
            payment_status: sale.payment_status,
            sale_status: sale.sale_status,
            provider_status: sale.provider_status.clone(),
            provider_status_detail: sale.provider_status_detail.clone(),
        }
    }
}
