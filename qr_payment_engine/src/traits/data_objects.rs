use chrono::{DateTime, Utc};

use crate::db_types::{PaymentStatus, SaleStatus};

/// The set of sale fields one reconciliation step may change. Only fields that are `Some` are
/// written; the whole update is applied as a single-row statement so concurrent webhook calls
/// cannot interleave partial writes.
#[derive(Debug, Clone, Default)]
pub struct SalePaymentUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub sale_status: Option<SaleStatus>,
    pub provider_payment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub provider_status: Option<String>,
    /// Two-level option: the outer level decides whether the column is written at all, the inner
    /// value is what gets stored. `Some(None)` clears a stale detail from an earlier attempt.
    pub provider_status_detail: Option<Option<String>>,
    pub provider_payload: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// When true, `status_updated_at` is stamped with the database's current time. Callers set
    /// this only when `sale_status` actually changes.
    pub stamp_status_update: bool,
}

impl SalePaymentUpdate {
    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none() &&
            self.sale_status.is_none() &&
            self.provider_payment_id.is_none() &&
            self.provider_order_id.is_none() &&
            self.provider_status.is_none() &&
            self.provider_status_detail.is_none() &&
            self.provider_payload.is_none() &&
            self.paid_at.is_none() &&
            !self.stamp_status_update
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_sale_status(mut self, status: SaleStatus) -> Self {
        self.sale_status = Some(status);
        self
    }

    pub fn with_provider_payment_id<S: Into<String>>(mut self, id: S) -> Self {
        self.provider_payment_id = Some(id.into());
        self
    }

    pub fn with_provider_order_id<S: Into<String>>(mut self, id: S) -> Self {
        self.provider_order_id = Some(id.into());
        self
    }

    pub fn with_provider_status<S: Into<String>>(mut self, status: S) -> Self {
        self.provider_status = Some(status.into());
        self
    }

    pub fn with_provider_status_detail(mut self, detail: Option<String>) -> Self {
        self.provider_status_detail = Some(detail);
        self
    }

    pub fn with_provider_payload<S: Into<String>>(mut self, payload: S) -> Self {
        self.provider_payload = Some(payload.into());
        self
    }

    pub fn with_paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    pub fn stamping_status_update(mut self) -> Self {
        self.stamp_status_update = true;
        self
    }
}
