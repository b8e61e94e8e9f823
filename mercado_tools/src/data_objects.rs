use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payment record as returned by `GET /v1/payments/{id}` and by the payment search endpoint.
/// Only the fields the reconciliation flow reads are modelled; everything else in the provider's
/// (large) payment object is ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    pub status_detail: Option<String>,
    pub date_approved: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_last_updated: Option<DateTime<Utc>>,
    pub external_reference: Option<String>,
    pub transaction_amount: Option<f64>,
    /// Link back to the merchant order this payment belongs to, when the provider includes it.
    pub order: Option<OrderLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderLink {
    pub id: i64,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
}

/// A merchant order: the provider-side aggregate for one QR charge request. It accumulates zero
/// or more payment attempts as the buyer scans and (re)tries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantOrderDetail {
    pub id: i64,
    pub status: Option<String>,
    pub order_status: Option<String>,
    pub external_reference: Option<String>,
    pub preference_id: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payments: Vec<MerchantOrderPayment>,
}

/// The abbreviated payment entries embedded in a merchant order. These carry less detail than
/// [`PaymentDetail`]; the flow uses them only to pick a payment id worth fetching in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantOrderPayment {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<f64>,
    pub date_approved: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSearchResults {
    pub paging: Option<Paging>,
    #[serde(default)]
    pub results: Vec<PaymentDetail>,
}
