use std::fmt::Display;

use qpg_common::Cents;
use qr_payment_engine::db_types::SaleId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of a `POST /sales` request. The point of sale may bring its own sale id; if it does not,
/// the server mints one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleRequest {
    pub id: Option<SaleId>,
    pub total: Cents,
}

/// Response to a successful `POST /sales` call. The external reference is what the point of sale
/// must attach to the provider charge so that webhook notifications correlate back to this sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCreatedResponse {
    pub id: SaleId,
    pub total: Cents,
    pub external_reference: String,
}
