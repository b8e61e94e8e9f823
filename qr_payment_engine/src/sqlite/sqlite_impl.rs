//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the
//! [`crate::traits`] module.
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, sales, webhook_events};
use crate::{
    db_types::{NewSale, Sale, SaleId, WebhookTopic},
    traits::{ReconciliationDatabase, SaleApiError, SalePaymentUpdate},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database given by `QPG_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, SaleApiError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SaleApiError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReconciliationDatabase for SqliteDatabase {
    async fn fetch_sale(&self, id: &SaleId) -> Result<Option<Sale>, SaleApiError> {
        let mut conn = self.pool.acquire().await?;
        let sale = sales::fetch_sale_by_id(id, &mut conn).await?;
        Ok(sale)
    }

    async fn fetch_sale_by_order_id(&self, provider_order_id: &str) -> Result<Option<Sale>, SaleApiError> {
        let mut conn = self.pool.acquire().await?;
        let sale = sales::fetch_sale_by_order_id(provider_order_id, &mut conn).await?;
        Ok(sale)
    }

    async fn fetch_sale_by_payment_id(&self, provider_payment_id: &str) -> Result<Option<Sale>, SaleApiError> {
        let mut conn = self.pool.acquire().await?;
        let sale = sales::fetch_sale_by_payment_id(provider_payment_id, &mut conn).await?;
        Ok(sale)
    }

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale, SaleApiError> {
        let mut conn = self.pool.acquire().await?;
        let sale = sales::insert_sale(sale, &mut conn).await?;
        debug!("🗃️ Sale {} has been saved in the DB", sale.id);
        Ok(sale)
    }

    async fn update_sale_payment(&self, id: &SaleId, update: SalePaymentUpdate) -> Result<Sale, SaleApiError> {
        let mut tx = self.pool.begin().await?;
        let updated = sales::update_sale(id, update, &mut tx).await?;
        tx.commit().await?;
        let sale = updated.ok_or_else(|| SaleApiError::SaleNotFound(id.clone()))?;
        debug!("🗃️ Sale {} updated. Status is now {}/{}", sale.id, sale.sale_status, sale.payment_status);
        Ok(sale)
    }

    async fn record_webhook_event_if_new(
        &self,
        provider: &str,
        topic: WebhookTopic,
        resource_id: &str,
    ) -> Result<bool, SaleApiError> {
        let mut conn = self.pool.acquire().await?;
        let is_new = webhook_events::record_if_new(provider, topic, resource_id, &mut conn).await?;
        if is_new {
            debug!("🗃️ Webhook event {topic}:{resource_id} recorded on the ledger");
        }
        Ok(is_new)
    }
}
