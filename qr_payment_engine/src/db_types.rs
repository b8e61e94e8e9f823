//! Data types that are used in the database and across the public API.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use log::*;
use qpg_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// The prefix the point of sale attaches to every external reference it sends to the provider.
/// `sale-{sale_id}` is what comes back on payments and merchant orders, and stripping it is the
/// most direct way of correlating a provider record to a sale.
pub const EXTERNAL_REFERENCE_PREFIX: &str = "sale-";

//--------------------------------------        SaleId        ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SaleId(pub String);

impl SaleId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The external reference this sale is known by on the provider side.
    pub fn external_reference(&self) -> String {
        format!("{EXTERNAL_REFERENCE_PREFIX}{}", self.0)
    }

    /// Recovers a sale id from an external reference, if it carries the known prefix.
    pub fn from_external_reference(reference: &str) -> Option<Self> {
        reference.strip_prefix(EXTERNAL_REFERENCE_PREFIX).filter(|s| !s.is_empty()).map(Self::new)
    }
}

impl From<String> for SaleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SaleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for SaleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      SaleStatus      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SaleStatus {
    /// The sale has been created and no terminal payment result has arrived yet.
    Pending,
    /// The provider confirmed payment. Absorbing: no later notification regresses an approved
    /// sale, although bookkeeping fields may still be refreshed.
    Approved,
    /// The payment was rejected, cancelled, refunded or charged back. May still be superseded by
    /// a later approval of a fresh payment attempt.
    Rejected,
    /// The charge expired before anyone paid it.
    Expired,
    /// The sale was cancelled at the point of sale. This subsystem never sets it.
    Cancelled,
}

impl FromStr for SaleStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            "Expired" => Ok(Self::Expired),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(InvalidStatus),
        }
    }
}

impl From<String> for SaleStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid sale status: {value}. Defaulting to Pending");
            SaleStatus::Pending
        })
    }
}

impl Display for SaleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Expired => write!(f, "Expired"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No payment, or a payment that has not reached a terminal state.
    Pending,
    /// The payment was accredited.
    Approved,
    /// The payment failed (rejected, cancelled, refunded or charged back).
    Rejected,
    /// The payment attempt expired.
    Expired,
}

impl FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            "Expired" => Ok(Self::Expired),
            _ => Err(InvalidStatus),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion from string to status")]
pub struct InvalidStatus;

//--------------------------------------    WebhookTopic      ---------------------------------------------------------

/// The two notification families the provider sends for QR charges. Everything else the provider
/// can emit is dropped at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebhookTopic {
    Payment,
    MerchantOrder,
}

impl FromStr for WebhookTopic {
    type Err = InvalidTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payment" | "payments" => Ok(Self::Payment),
            "merchant_order" | "merchant_orders" => Ok(Self::MerchantOrder),
            _ => Err(InvalidTopic(s.to_string())),
        }
    }
}

impl Display for WebhookTopic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::MerchantOrder => write!(f, "merchant_order"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{0} is not a webhook topic this gateway handles")]
pub struct InvalidTopic(pub String);

//--------------------------------------         Sale         ---------------------------------------------------------

/// A sale record as stored in the database. Created by the point of sale when a buyer chooses the
/// QR payment method; after that, only the reconciliation flow mutates it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: SaleId,
    pub total: Cents,
    pub sale_status: SaleStatus,
    pub payment_status: PaymentStatus,
    /// Id of the provider payment that last touched this sale.
    pub provider_payment_id: Option<String>,
    /// Id of the provider merchant order this sale's charge lives under.
    pub provider_order_id: Option<String>,
    /// The provider's status string, verbatim, for audit.
    pub provider_status: Option<String>,
    pub provider_status_detail: Option<String>,
    /// Raw provider payload snapshot (opaque JSON text).
    pub provider_payload: Option<String>,
    /// Set exactly once, on the first transition into Approved.
    pub paid_at: Option<DateTime<Utc>>,
    /// Stamped only when `sale_status` actually changes.
    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn external_reference(&self) -> String {
        self.id.external_reference()
    }
}

impl Display for Sale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sale {} ({}): {}/{}", self.id, self.total, self.sale_status, self.payment_status)
    }
}

//--------------------------------------       NewSale        ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub id: SaleId,
    pub total: Cents,
}

impl NewSale {
    pub fn new<S: Into<SaleId>>(id: S, total: Cents) -> Self {
        Self { id: id.into(), total }
    }
}

impl Display for NewSale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "New sale {} for {}", self.id, self.total)
    }
}

//--------------------------------------    WebhookEvent      ---------------------------------------------------------

/// One row of the idempotency ledger. Never updated, never deleted; its only job is to make a
/// second delivery of the same (provider, topic, resource id) tuple detectable.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    pub provider: String,
    pub topic: WebhookTopic,
    pub resource_id: String,
    pub received_at: DateTime<Utc>,
}
