//! The reconciliation entry point.
//!
//! `WebhookFlowApi` drives every notification through the same pipeline: resolve identity,
//! record it on the idempotency ledger, query the provider for authoritative state, correlate a
//! local sale, map the status and apply the transition. The state machine rules live here:
//!
//! | Rule | Behavior |
//! |------|----------|
//! | Approved is absorbing | once a sale is Approved, no later event moves it elsewhere |
//! | Rejected/Expired are not | a later approved payment supersedes them |
//! | No-op guard | an event mapping to the current statuses writes nothing and notifies no one |
//! | `paid_at` | set once, on the first transition into Approved |
//! | `status_updated_at` | stamped only when the sale status actually changes |
//!
//! Benign dead ends (unresolvable events, unknown sales, resources the provider cannot see yet)
//! are reported as [`WebhookOutcome`] variants so the HTTP layer can acknowledge them with a
//! 200. Only infrastructure failures surface as [`WebhookFlowError`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use log::*;
use mercado_tools::{MerchantOrderPayment, PaymentDetail};
use thiserror::Error;
use tokio::{
    sync::Notify,
    time::{sleep, Duration, Instant},
};

use crate::{
    db_types::{PaymentStatus, Sale, SaleId, SaleStatus, WebhookTopic},
    events::{PaymentStatusEvent, SaleSubscriptions},
    reconcile::{
        correlate::{correlate_sale, CorrelationKeys},
        retry::{RetryChains, RetryConfig},
        status::{map_provider_status, MappedStatus},
    },
    traits::{ProviderApi, ProviderApiError, ReconciliationDatabase, SaleApiError, SalePaymentUpdate},
    webhook::{
        resource::{resolve_event, ResolvedEvent},
        WebhookRequest,
    },
};

/// Tag under which events land on the idempotency ledger.
pub const PROVIDER_TAG: &str = "mercadopago";

/// What a single webhook delivery amounted to. Everything except the error path of
/// [`WebhookFlowApi::process_webhook`] is an acknowledgeable outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The sale moved to a new status pair and subscribers were notified.
    Updated { sale_id: SaleId, payment_status: PaymentStatus, sale_status: SaleStatus },
    /// The event mapped to exactly the sale's current statuses. Nothing was written.
    NoChange { sale_id: SaleId },
    /// The (provider, topic, resource id) tuple was already on the ledger.
    Duplicate,
    /// No topic or resource id could be resolved from the request.
    Unresolvable,
    /// No local sale matches any correlation key.
    SaleNotFound,
    /// The provider has no queryable record of the resource yet.
    PaymentNotVisible,
    /// A merchant order with no usable payment. Linkage was stored and retries scheduled.
    AwaitingPayment { retries_scheduled: bool },
}

#[derive(Debug, Clone, Error)]
pub enum WebhookFlowError {
    #[error("Provider query failed: {0}")]
    ProviderError(#[from] ProviderApiError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] SaleApiError),
}

/// The reconciliation engine. Generic over the database and provider client so the flow can be
/// tested against stubs; cloning is cheap and every clone shares the subscriber registry and the
/// live retry chains.
#[derive(Clone)]
pub struct WebhookFlowApi<B, P> {
    db: B,
    provider: P,
    subscriptions: SaleSubscriptions,
    retries: RetryChains,
    retry_config: RetryConfig,
}

impl<B, P> WebhookFlowApi<B, P>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    pub fn new(db: B, provider: P) -> Self {
        Self {
            db,
            provider,
            subscriptions: SaleSubscriptions::new(),
            retries: RetryChains::default(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// The per-sale event fan-out. The server's event stream endpoint subscribes through this.
    pub fn subscriptions(&self) -> &SaleSubscriptions {
        &self.subscriptions
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Whether a retry chain is currently live for the given merchant order.
    pub async fn retry_pending(&self, order_id: &str) -> bool {
        self.retries.is_scheduled(order_id).await
    }

    /// Processes one provider notification end to end. Call this only after the HTTP layer has
    /// dealt with signature policy; the flow itself trusts the request.
    pub async fn process_webhook(&self, req: &WebhookRequest) -> Result<WebhookOutcome, WebhookFlowError> {
        let request_id = req.request_id().unwrap_or("-");
        let Some(ResolvedEvent { topic, resource_id }) = resolve_event(req) else {
            info!("🔄️ Webhook {request_id} carries no resolvable topic or resource id. Acknowledging and dropping.");
            return Ok(WebhookOutcome::Unresolvable);
        };
        let is_new = self.db.record_webhook_event_if_new(PROVIDER_TAG, topic, &resource_id).await?;
        if !is_new {
            info!("🔄️ Duplicate delivery of {topic}:{resource_id} (request {request_id}). Skipping.");
            return Ok(WebhookOutcome::Duplicate);
        }
        debug!("🔄️ Accepted {topic}:{resource_id} (request {request_id})");
        match topic {
            WebhookTopic::Payment => self.process_payment_event(&resource_id, None).await,
            WebhookTopic::MerchantOrder => self.process_merchant_order_event(&resource_id).await,
        }
    }

    /// The payment branch. Fetches the authoritative payment state, correlates a sale and
    /// applies the status transition. `merchant_order_id` carries the order linkage when this
    /// payment was discovered through a merchant-order event; it takes precedence over the
    /// linkage in the payment payload.
    pub async fn process_payment_event(
        &self,
        payment_id: &str,
        merchant_order_id: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookFlowError> {
        let payment = match self.provider.payment(payment_id).await {
            Ok(payment) => payment,
            Err(e) if e.is_not_found() => {
                info!("🔄️ Payment {payment_id} is not visible on the provider yet. Nothing to do.");
                return Ok(WebhookOutcome::PaymentNotVisible);
            },
            Err(e) => return Err(e.into()),
        };
        let payload_order_id = payment.order.as_ref().map(|o| o.id.to_string());
        let mut keys = CorrelationKeys::new().with_payment_id(payment_id);
        if let Some(reference) = &payment.external_reference {
            keys = keys.with_external_reference(reference);
        }
        if let Some(order_id) = merchant_order_id.map(str::to_string).or_else(|| payload_order_id.clone()) {
            keys = keys.with_merchant_order_id(order_id);
        }
        let Some(sale) = correlate_sale(&self.db, &keys).await? else {
            warn!(
                "🔄️ No sale matches payment {payment_id} (external reference {:?}, merchant order {:?}). \
                 Acknowledging and dropping.",
                payment.external_reference, keys.merchant_order_id
            );
            return Ok(WebhookOutcome::SaleNotFound);
        };
        let mapped = map_provider_status(&payment.status, payment.status_detail.as_deref());
        if mapped.unknown {
            warn!(
                "🔄️ Unknown provider status '{}' on payment {payment_id}. Treating it as Pending.",
                payment.status
            );
        }
        let outcome = self.apply_transition(sale, &payment, mapped, merchant_order_id).await?;
        if matches!(outcome, WebhookOutcome::Updated { .. } | WebhookOutcome::NoChange { .. }) {
            if let Some(order_id) = merchant_order_id.map(str::to_string).or(payload_order_id) {
                self.retries.cancel(&order_id).await;
            }
        }
        Ok(outcome)
    }

    /// Applies the mapped statuses to a correlated sale, honoring the state machine rules in the
    /// module docs. Writes at most one row and emits at most one event.
    async fn apply_transition(
        &self,
        sale: Sale,
        payment: &PaymentDetail,
        mapped: MappedStatus,
        explicit_order_id: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookFlowError> {
        let next_payment_status = mapped.payment_status;
        let next_sale_status =
            if sale.sale_status == SaleStatus::Approved { SaleStatus::Approved } else { mapped.sale_status };
        if next_payment_status == sale.payment_status && next_sale_status == sale.sale_status {
            debug!(
                "🔄️ Sale {} is already {} / {}. Skipping the write and the notification.",
                sale.id, sale.sale_status, sale.payment_status
            );
            return Ok(WebhookOutcome::NoChange { sale_id: sale.id });
        }
        let sale_status_changed = next_sale_status != sale.sale_status;
        let mut update = SalePaymentUpdate::default()
            .with_payment_status(next_payment_status)
            .with_sale_status(next_sale_status)
            .with_provider_payment_id(payment.id.to_string())
            .with_provider_status(payment.status.clone())
            .with_provider_status_detail(payment.status_detail.clone());
        if let Ok(payload) = serde_json::to_string(payment) {
            update = update.with_provider_payload(payload);
        }
        // order linkage: explicit (from the merchant-order branch) beats payload beats stored
        let order_id = explicit_order_id
            .map(str::to_string)
            .or_else(|| payment.order.as_ref().map(|o| o.id.to_string()))
            .or_else(|| sale.provider_order_id.clone());
        if let Some(order_id) = order_id {
            update = update.with_provider_order_id(order_id);
        }
        if next_payment_status == PaymentStatus::Approved && sale.paid_at.is_none() {
            update = update.with_paid_at(payment.date_approved.unwrap_or_else(Utc::now));
        }
        if sale_status_changed {
            update = update.stamping_status_update();
        }
        let updated = self.db.update_sale_payment(&sale.id, update).await?;
        info!(
            "🔄️ Sale {}: {} / {} → {} / {} (payment {})",
            updated.id, sale.sale_status, sale.payment_status, updated.sale_status, updated.payment_status, payment.id
        );
        self.subscriptions.notify(PaymentStatusEvent::from_sale(&updated)).await;
        Ok(WebhookOutcome::Updated {
            sale_id: updated.id,
            payment_status: updated.payment_status,
            sale_status: updated.sale_status,
        })
    }

    /// The merchant-order branch. Orders that already carry payments delegate to the payment
    /// branch with the best candidate. Orders with no payments yet store a provisional linkage
    /// (if it changed) and schedule the retry chain.
    async fn process_merchant_order_event(&self, order_id: &str) -> Result<WebhookOutcome, WebhookFlowError> {
        let order = match self.provider.merchant_order(order_id).await {
            Ok(order) => order,
            Err(e) if e.is_not_found() => {
                info!("🔄️ Merchant order {order_id} is not visible on the provider yet. Nothing to do.");
                return Ok(WebhookOutcome::PaymentNotVisible);
            },
            Err(e) => return Err(e.into()),
        };
        if let Some(best) = select_best_payment(&order.payments) {
            debug!(
                "🔄️ Merchant order {order_id} carries {} payment(s). Processing payment {}.",
                order.payments.len(),
                best.id
            );
            return self.process_payment_event(&best.id.to_string(), Some(order_id)).await;
        }
        info!("🔄️ Merchant order {order_id} has no payments yet.");
        let mut keys = CorrelationKeys::new().with_merchant_order_id(order_id);
        if let Some(reference) = &order.external_reference {
            keys = keys.with_external_reference(reference);
        }
        match correlate_sale(&self.db, &keys).await? {
            Some(sale) if sale.provider_order_id.as_deref() != Some(order_id) => {
                let update = SalePaymentUpdate::default().with_provider_order_id(order_id.to_string());
                self.db.update_sale_payment(&sale.id, update).await?;
                info!("🔄️ Sale {}: linked to merchant order {order_id} while awaiting payment", sale.id);
            },
            Some(sale) => {
                debug!("🔄️ Sale {} is already linked to merchant order {order_id}. Nothing to write.", sale.id);
            },
            None => {
                warn!(
                    "🔄️ No sale matches merchant order {order_id} yet (external reference {:?})",
                    order.external_reference
                );
            },
        }
        let retries_scheduled = self.schedule_retry_chain(order_id, order.external_reference.clone()).await;
        Ok(WebhookOutcome::AwaitingPayment { retries_scheduled })
    }

    /// Spawns the retry chain for an empty merchant order, unless one is already running or
    /// retries are disabled. The chain is a single task that owns its whole schedule.
    async fn schedule_retry_chain(&self, order_id: &str, external_reference: Option<String>) -> bool {
        if self.retry_config.offsets.is_empty() {
            debug!("🕰️ Retries are disabled. Merchant order {order_id} will wait for its payment webhook.");
            return false;
        }
        let Some((resolved, waker)) = self.retries.register(order_id).await else {
            return false;
        };
        let offsets = self.retry_config.offsets.clone();
        info!("🕰️ Scheduling {} retries for merchant order {order_id}", offsets.len());
        let api = self.clone();
        let order_id = order_id.to_string();
        tokio::spawn(async move {
            api.run_retry_chain(order_id, external_reference, offsets, resolved, waker).await;
        });
        true
    }

    /// Body of a retry chain. Sleeps to each offset (measured from scheduling), re-polls, and
    /// stops on the first poll that finds a payment, on cancellation, or when the offsets run
    /// out. Poll failures are logged and never propagate anywhere.
    async fn run_retry_chain(
        self,
        order_id: String,
        external_reference: Option<String>,
        offsets: Vec<Duration>,
        resolved: Arc<AtomicBool>,
        waker: Arc<Notify>,
    ) {
        let started = Instant::now();
        let total = offsets.len();
        for (n, offset) in offsets.into_iter().enumerate() {
            let elapsed = started.elapsed();
            if offset > elapsed {
                tokio::select! {
                    _ = sleep(offset - elapsed) => {},
                    _ = waker.notified() => {},
                }
            }
            if resolved.load(Ordering::SeqCst) {
                debug!("🕰️ Merchant order {order_id} was settled elsewhere. Stopping retries.");
                break;
            }
            debug!("🕰️ Retry {}/{total} for merchant order {order_id}", n + 1);
            match self.attempt_order_recovery(&order_id, external_reference.as_deref()).await {
                Ok(true) => {
                    resolved.store(true, Ordering::SeqCst);
                    info!("🕰️ Merchant order {order_id} settled on retry {}/{total}", n + 1);
                    break;
                },
                Ok(false) => debug!("🕰️ Merchant order {order_id} still has no usable payment"),
                Err(e) => warn!("🕰️ Retry {}/{total} for merchant order {order_id} failed: {e}", n + 1),
            }
        }
        self.retries.remove(&order_id).await;
        debug!("🕰️ Retry chain for merchant order {order_id} finished");
    }

    /// One re-poll: fetch the order again and process its best payment, falling back to a search
    /// by external reference. Returns true when a payment id was found and processed, which ends
    /// the chain; a payment the provider still cannot serve keeps the chain alive.
    async fn attempt_order_recovery(
        &self,
        order_id: &str,
        external_reference: Option<&str>,
    ) -> Result<bool, WebhookFlowError> {
        let order = match self.provider.merchant_order(order_id).await {
            Ok(order) => Some(order),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        if let Some(order) = &order {
            if let Some(best) = select_best_payment(&order.payments) {
                let outcome = self.process_payment_event(&best.id.to_string(), Some(order_id)).await?;
                return Ok(!matches!(outcome, WebhookOutcome::PaymentNotVisible));
            }
        }
        let reference = external_reference
            .map(str::to_string)
            .or_else(|| order.as_ref().and_then(|o| o.external_reference.clone()));
        let Some(reference) = reference else {
            return Ok(false);
        };
        let results = self.provider.search_payments_by_reference(&reference).await?;
        let Some(best) = select_best_search_result(&results) else {
            return Ok(false);
        };
        debug!("🕰️ Search by reference '{reference}' found payment {} for merchant order {order_id}", best.id);
        let outcome = self.process_payment_event(&best.id.to_string(), Some(order_id)).await?;
        Ok(!matches!(outcome, WebhookOutcome::PaymentNotVisible))
    }
}

/// Picks the payment worth reconciling from a merchant order: approved payments beat everything,
/// ties go to the most recent timestamp (approval date, then last modification, then creation).
pub(crate) fn select_best_payment(payments: &[MerchantOrderPayment]) -> Option<&MerchantOrderPayment> {
    let approved: Vec<&MerchantOrderPayment> = payments
        .iter()
        .filter(|p| map_provider_status(&p.status, p.status_detail.as_deref()).payment_status == PaymentStatus::Approved)
        .collect();
    let pool = if approved.is_empty() { payments.iter().collect() } else { approved };
    pool.into_iter().max_by_key(|p| order_payment_timestamp(p))
}

fn order_payment_timestamp(payment: &MerchantOrderPayment) -> DateTime<Utc> {
    payment
        .date_approved
        .or(payment.last_modified)
        .or(payment.date_created)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Same ranking, applied to full payment records coming back from a search.
pub(crate) fn select_best_search_result(payments: &[PaymentDetail]) -> Option<&PaymentDetail> {
    let approved: Vec<&PaymentDetail> = payments
        .iter()
        .filter(|p| map_provider_status(&p.status, p.status_detail.as_deref()).payment_status == PaymentStatus::Approved)
        .collect();
    let pool = if approved.is_empty() { payments.iter().collect() } else { approved };
    pool.into_iter().max_by_key(|p| search_result_timestamp(p))
}

fn search_result_timestamp(payment: &PaymentDetail) -> DateTime<Utc> {
    payment
        .date_approved
        .or(payment.date_last_updated)
        .or(payment.date_created)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
