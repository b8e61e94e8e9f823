use std::{collections::HashMap, sync::Arc};

use log::*;
use tokio::sync::{mpsc, Mutex};

use crate::db_types::SaleId;

use super::PaymentStatusEvent;

/// Events queued per subscriber before slow consumers start losing them.
const SUBSCRIBER_BUFFER: usize = 16;

/// Per-sale event fan-out. Subscribers register for exactly one sale id and receive that sale's
/// payment status events until they drop their receiver. Closed channels are pruned on the next
/// notification for the sale.
#[derive(Clone, Default)]
pub struct SaleSubscriptions {
    subscribers: Arc<Mutex<HashMap<SaleId, Vec<mpsc::Sender<PaymentStatusEvent>>>>>,
}

impl SaleSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one sale's payment status events.
    pub async fn subscribe(&self, sale_id: &SaleId) -> mpsc::Receiver<PaymentStatusEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.entry(sale_id.clone()).or_default().push(tx);
        debug!("📬️ New subscriber for sale {sale_id}");
        rx
    }

    /// Delivers an event to every live subscriber of its sale. Subscribers with a full buffer
    /// lose the event (with a warning) rather than stalling delivery for everyone else.
    pub async fn notify(&self, event: PaymentStatusEvent) {
        let mut subscribers = self.subscribers.lock().await;
        let Some(senders) = subscribers.get_mut(&event.sale_id) else {
            trace!("📬️ No subscribers for sale {}", event.sale_id);
            return;
        };
        let mut live = Vec::with_capacity(senders.len());
        let mut delivered = 0usize;
        for tx in senders.drain(..) {
            match tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    live.push(tx);
                },
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("📬️ A subscriber for sale {} is not keeping up. Event dropped.", event.sale_id);
                    live.push(tx);
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    trace!("📬️ Pruning closed subscriber for sale {}", event.sale_id);
                },
            }
        }
        *senders = live;
        let prune = senders.is_empty();
        if prune {
            subscribers.remove(&event.sale_id);
        }
        debug!(
            "📬️ Sale {}: payment status {} delivered to {delivered} subscriber(s)",
            event.sale_id, event.payment_status
        );
    }
}
