//! Payout storage and the balance aggregates behind the payout guard

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::util::snowflake_id;

/// Payout lifecycle. Pending and processing payouts both count against the
/// available balance (in-flight money is spoken for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct PayoutRow {
    pub id: i64,
    pub retailer_id: i64,
    pub requested_amount: Decimal,
    pub requested_currency: String,
    pub base_amount: Decimal,
    pub status: String,
    pub transfer_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Take the per-retailer row lock that serializes balance evaluation against
/// concurrent payout requests. Returns false for an unknown retailer.
pub async fn lock_retailer(conn: &mut PgConnection, retailer_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM retailers WHERE id = $1 FOR UPDATE")
        .bind(retailer_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Settled revenue: retailer-net of groups whose payment has been confirmed
/// (pending and cancelled groups are excluded)
pub async fn sum_settled_net(
    conn: &mut PgConnection,
    retailer_id: i64,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(retailer_net), 0)
         FROM order_groups
         WHERE retailer_id = $1
           AND status IN ('processing', 'shipped', 'delivered')
           AND retailer_net IS NOT NULL",
    )
    .bind(retailer_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn sum_completed_payouts(
    conn: &mut PgConnection,
    retailer_id: i64,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(base_amount), 0)
         FROM payouts WHERE retailer_id = $1 AND status = 'completed'",
    )
    .bind(retailer_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn sum_in_flight_payouts(
    conn: &mut PgConnection,
    retailer_id: i64,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(base_amount), 0)
         FROM payouts WHERE retailer_id = $1 AND status IN ('pending', 'processing')",
    )
    .bind(retailer_id)
    .fetch_one(&mut *conn)
    .await
}

pub struct NewPayout<'a> {
    pub retailer_id: i64,
    pub requested_amount: Decimal,
    pub requested_currency: &'a str,
    pub base_amount: Decimal,
    pub notes: Option<&'a str>,
    pub now: i64,
}

pub async fn insert(conn: &mut PgConnection, payout: &NewPayout<'_>) -> Result<i64, sqlx::Error> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO payouts (id, retailer_id, requested_amount, requested_currency,
                              base_amount, status, notes, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(payout.retailer_id)
    .bind(payout.requested_amount)
    .bind(payout.requested_currency)
    .bind(payout.base_amount)
    .bind(PayoutStatus::Pending.as_db())
    .bind(payout.notes)
    .bind(payout.now)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<PayoutRow>, sqlx::Error> {
    sqlx::query_as::<_, PayoutRow>(
        "SELECT id, retailer_id, requested_amount, requested_currency, base_amount,
                status, transfer_ref, notes, created_at, completed_at
         FROM payouts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_completed(
    pool: &PgPool,
    id: i64,
    transfer_ref: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payouts SET status = $2, transfer_ref = $3, completed_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(PayoutStatus::Completed.as_db())
    .bind(transfer_ref)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payouts SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(PayoutStatus::Failed.as_db())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_for_retailer(
    pool: &PgPool,
    retailer_id: i64,
) -> Result<Vec<PayoutRow>, sqlx::Error> {
    sqlx::query_as::<_, PayoutRow>(
        "SELECT id, retailer_id, requested_amount, requested_currency, base_amount,
                status, transfer_ref, notes, created_at, completed_at
         FROM payouts WHERE retailer_id = $1 ORDER BY created_at DESC",
    )
    .bind(retailer_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for s in [
            PayoutStatus::Pending,
            PayoutStatus::Processing,
            PayoutStatus::Completed,
            PayoutStatus::Failed,
        ] {
            assert_eq!(PayoutStatus::from_db(s.as_db()), Some(s));
        }
        assert_eq!(PayoutStatus::from_db("reversed"), None);
    }
}
