//! Reward points balance and append-only transaction ledger

use sqlx::PgPool;

use crate::util::snowflake_id;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PointsBalance {
    pub user_id: i64,
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub points: i64,
    pub order_group_id: Option<i64>,
    pub created_at: i64,
}

/// Current balance, zero when the user has no account row yet
pub async fn get_balance(pool: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT balance FROM points_balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0).unwrap_or(0))
}

pub async fn get_account(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<PointsBalance>, sqlx::Error> {
    sqlx::query_as::<_, PointsBalance>(
        "SELECT user_id, balance, total_earned, total_redeemed
         FROM points_balances WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Conditional debit: the balance check and the decrement are one statement,
/// so a concurrent redemption cannot push the balance negative. Returns false
/// when the balance no longer covers the debit.
pub async fn debit<'e, E>(executor: E, user_id: i64, points: i64) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let result = sqlx::query(
        "UPDATE points_balances
         SET balance = balance - $2, total_redeemed = total_redeemed + $2
         WHERE user_id = $1 AND balance >= $2",
    )
    .bind(user_id)
    .bind(points)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Credit points (cashback accrual), creating the account row on first earn
pub async fn credit<'e, E>(executor: E, user_id: i64, points: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        "INSERT INTO points_balances (user_id, balance, total_earned, total_redeemed)
         VALUES ($1, $2, $2, 0)
         ON CONFLICT (user_id) DO UPDATE SET
            balance = points_balances.balance + $2,
            total_earned = points_balances.total_earned + $2",
    )
    .bind(user_id)
    .bind(points)
    .execute(executor)
    .await?;
    Ok(())
}

/// Append a ledger entry. `kind` is "earned" or "redeemed".
pub async fn insert_transaction<'e, E>(
    executor: E,
    user_id: i64,
    kind: &str,
    points: i64,
    order_group_id: Option<i64>,
    now: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        "INSERT INTO points_transactions (id, user_id, kind, points, order_group_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(snowflake_id())
    .bind(user_id)
    .bind(kind)
    .bind(points)
    .bind(order_group_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_transactions(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<PointsTransaction>, sqlx::Error> {
    sqlx::query_as::<_, PointsTransaction>(
        "SELECT id, user_id, kind, points, order_group_id, created_at
         FROM points_transactions
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
