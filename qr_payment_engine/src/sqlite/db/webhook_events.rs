use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{WebhookEvent, WebhookTopic},
    traits::SaleApiError,
};

/// Records an accepted webhook delivery on the idempotency ledger. The UNIQUE index over
/// (provider, topic, resource_id) is what makes this safe under concurrent writers: the first
/// insert wins and every other one comes back as a unique violation, which is translated to
/// `Ok(false)` here. Every other database failure propagates untouched.
pub async fn record_if_new(
    provider: &str,
    topic: WebhookTopic,
    resource_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SaleApiError> {
    let result = sqlx::query("INSERT INTO webhook_events (provider, topic, resource_id) VALUES ($1, $2, $3)")
        .bind(provider)
        .bind(topic)
        .bind(resource_id)
        .execute(conn)
        .await;
    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => {
            debug!("📝️ Event {topic}:{resource_id} from {provider} is already on the ledger");
            Ok(false)
        },
        Err(e) => Err(e.into()),
    }
}

/// Fetches a ledger entry, mostly for audit queries and tests.
pub async fn fetch_event(
    provider: &str,
    topic: WebhookTopic,
    resource_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookEvent>, sqlx::Error> {
    let event =
        sqlx::query_as("SELECT * FROM webhook_events WHERE provider = $1 AND topic = $2 AND resource_id = $3")
            .bind(provider)
            .bind(topic)
            .bind(resource_id)
            .fetch_optional(conn)
            .await?;
    Ok(event)
}
