//! Versioned platform configuration
//!
//! The commission rate is read fresh once per operation and stamped onto the
//! derived record (order group, settlement) and never recomputed later.

use rust_decimal::Decimal;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct CommissionRate {
    pub commission_rate: Decimal,
    pub version: i64,
}

pub async fn get_commission_rate(pool: &PgPool) -> Result<CommissionRate, sqlx::Error> {
    sqlx::query_as::<_, CommissionRate>(
        "SELECT commission_rate, version FROM platform_settings WHERE id = 1",
    )
    .fetch_one(pool)
    .await
}
