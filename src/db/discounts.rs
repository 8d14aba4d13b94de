//! Discount code storage

use rust_decimal::Decimal;
use sqlx::PgPool;

/// Discount computation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

impl DiscountKind {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscountCode {
    pub id: i64,
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: i64,
    pub valid_until: i64,
    pub is_active: bool,
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<DiscountCode>, sqlx::Error> {
    sqlx::query_as::<_, DiscountCode>(
        "SELECT id, code, kind, value, min_purchase, max_discount, usage_limit, used_count,
                valid_from, valid_until, is_active
         FROM discount_codes WHERE code = $1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Consume one use of a capped code. The conditional update makes concurrent
/// checkouts race safely: the loser observes zero rows affected and the
/// checkout degrades to its pre-discount amount.
pub async fn claim_usage<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let result = sqlx::query(
        "UPDATE discount_codes SET used_count = used_count + 1
         WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
