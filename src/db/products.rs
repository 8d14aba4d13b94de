//! Product and stock reads + the conditional stock decrement
//!
//! Product/category editing is an external collaborator; only the read paths
//! the checkout pipeline needs live here.

use rust_decimal::Decimal;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub retailer_id: i64,
    pub name: String,
    pub price: Decimal,
    pub is_active: bool,
}

pub async fn find_by_id(pool: &PgPool, product_id: i64) -> Result<Option<ProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductRow>(
        "SELECT id, retailer_id, name, price, is_active FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// Conditional stock decrement. One statement checks and decrements, so two
/// concurrent checkouts of the same product cannot jointly oversell it: the
/// loser observes zero rows affected.
pub async fn decrement_stock<'e, E>(
    executor: E,
    product_id: i64,
    quantity: i32,
    now: i64,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let result = sqlx::query(
        "UPDATE stock_units SET quantity = quantity - $2, updated_at = $3
         WHERE product_id = $1 AND quantity >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
