use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewSale, Sale, SaleId},
    traits::{SaleApiError, SalePaymentUpdate},
};

/// Inserts a new sale. Sale ids are assigned by the point of sale; reusing one is a caller bug
/// and reported as [`SaleApiError::SaleAlreadyExists`].
pub async fn insert_sale(sale: NewSale, conn: &mut SqliteConnection) -> Result<Sale, SaleApiError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO sales (id, total) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(sale.id.clone())
    .bind(sale.total)
    .fetch_one(conn)
    .await;
    match result {
        Ok(sale) => {
            trace!("📝️ Sale [{}] inserted", sale);
            Ok(sale)
        },
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => Err(SaleApiError::SaleAlreadyExists(sale.id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_sale_by_id(id: &SaleId, conn: &mut SqliteConnection) -> Result<Option<Sale>, sqlx::Error> {
    let sale = sqlx::query_as("SELECT * FROM sales WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(sale)
}

/// Returns the most recently created sale linked to the given provider merchant-order id.
pub async fn fetch_sale_by_order_id(
    provider_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Sale>, sqlx::Error> {
    let sale = sqlx::query_as("SELECT * FROM sales WHERE provider_order_id = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(provider_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(sale)
}

/// Returns the most recently created sale linked to the given provider payment id.
pub async fn fetch_sale_by_payment_id(
    provider_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Sale>, sqlx::Error> {
    let sale = sqlx::query_as("SELECT * FROM sales WHERE provider_payment_id = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(provider_payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(sale)
}

/// Applies a [`SalePaymentUpdate`] to a sale as one atomic UPDATE. Only fields present in the
/// update are touched; `updated_at` is always refreshed, `status_updated_at` only when the update
/// asks for it. Returns the updated row, or `None` if the sale does not exist.
pub(crate) async fn update_sale(
    id: &SaleId,
    update: SalePaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Sale>, SaleApiError> {
    if update.is_empty() {
        debug!("📝️ No fields to update for sale {id}. Update request skipped.");
        return Ok(fetch_sale_by_id(id, conn).await?);
    }
    let mut builder = QueryBuilder::new("UPDATE sales SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.payment_status {
        set_clause.push("payment_status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(status) = update.sale_status {
        set_clause.push("sale_status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(payment_id) = update.provider_payment_id {
        set_clause.push("provider_payment_id = ");
        set_clause.push_bind_unseparated(payment_id);
    }
    if let Some(order_id) = update.provider_order_id {
        set_clause.push("provider_order_id = ");
        set_clause.push_bind_unseparated(order_id);
    }
    if let Some(status) = update.provider_status {
        set_clause.push("provider_status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(detail) = update.provider_status_detail {
        // detail is Option<String>; None binds NULL and clears a stale value
        set_clause.push("provider_status_detail = ");
        set_clause.push_bind_unseparated(detail);
    }
    if let Some(payload) = update.provider_payload {
        set_clause.push("provider_payload = ");
        set_clause.push_bind_unseparated(payload);
    }
    if let Some(paid_at) = update.paid_at {
        set_clause.push("paid_at = ");
        set_clause.push_bind_unseparated(paid_at);
    }
    if update.stamp_status_update {
        set_clause.push("status_updated_at = CURRENT_TIMESTAMP");
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Sale::from_row(&row)).transpose()?;
    trace!("📝️ Result of update_sale: {res:?}");
    Ok(res)
}
