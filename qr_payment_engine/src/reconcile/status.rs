//! Maps the provider's status vocabulary onto the local state machine.

use crate::db_types::{PaymentStatus, SaleStatus};

/// The local statuses a provider status pair maps to. `unknown` marks vocabulary this gateway
/// does not recognize, which is mapped to Pending and logged loudly by the caller rather than
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedStatus {
    pub payment_status: PaymentStatus,
    pub sale_status: SaleStatus,
    pub unknown: bool,
}

impl MappedStatus {
    fn known(payment_status: PaymentStatus, sale_status: SaleStatus) -> Self {
        Self { payment_status, sale_status, unknown: false }
    }
}

/// Maps a provider status and optional status detail onto the local enums, case-insensitively.
///
/// The provider reports conflicting fields mid-transition: a payment can carry a primary status
/// of `pending` while the detail already says `accredited`. An accredited detail therefore
/// overrides a primary status that would otherwise map to Pending. It never overrides a terminal
/// primary status.
pub fn map_provider_status(status: &str, status_detail: Option<&str>) -> MappedStatus {
    let primary = status.trim().to_ascii_lowercase();
    let detail = status_detail.map(|d| d.trim().to_ascii_lowercase());
    let mapped = match primary.as_str() {
        "approved" | "accredited" => MappedStatus::known(PaymentStatus::Approved, SaleStatus::Approved),
        "pending" | "in_process" => MappedStatus::known(PaymentStatus::Pending, SaleStatus::Pending),
        "rejected" | "cancelled" | "refunded" | "charged_back" => {
            MappedStatus::known(PaymentStatus::Rejected, SaleStatus::Rejected)
        },
        "expired" => MappedStatus::known(PaymentStatus::Expired, SaleStatus::Expired),
        _ => MappedStatus { payment_status: PaymentStatus::Pending, sale_status: SaleStatus::Pending, unknown: true },
    };
    if mapped.payment_status == PaymentStatus::Pending && detail.as_deref() == Some("accredited") {
        return MappedStatus::known(PaymentStatus::Approved, SaleStatus::Approved);
    }
    mapped
}
