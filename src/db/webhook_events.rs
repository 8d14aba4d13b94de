//! Webhook idempotency ledger
//!
//! Insert-first, check rows_affected, which eliminates the TOCTOU race between
//! "have we seen this event" and "record that we saw it".

use sqlx::PgPool;

/// Record a webhook event id. Returns false when the event was already
/// processed (duplicate delivery).
pub async fn record(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
