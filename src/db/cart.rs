//! Cart line storage and the price/stock snapshot read

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::util::snowflake_id;

/// One cart line joined with its product's current price, stock and retailer.
/// The price in this snapshot is frozen for the lifetime of the checkout that
/// reads it; a concurrent price change cannot alter an in-flight checkout.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct CartLineSnapshot {
    pub product_id: i64,
    pub retailer_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub is_active: bool,
    pub available: i32,
    pub quantity: i32,
}

pub async fn list_snapshot(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<CartLineSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, CartLineSnapshot>(
        "SELECT c.product_id, p.retailer_id, p.name AS product_name, p.price AS unit_price,
                p.is_active, COALESCE(s.quantity, 0) AS available, c.quantity
         FROM cart_lines c
         JOIN products p ON p.id = c.product_id
         LEFT JOIN stock_units s ON s.product_id = c.product_id
         WHERE c.user_id = $1
         ORDER BY p.retailer_id, c.product_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Add or bump a cart line
pub async fn upsert_line(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_lines (id, user_id, product_id, quantity, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET quantity = cart_lines.quantity + $4",
    )
    .bind(snowflake_id())
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_line(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete the lines consumed by an order commit (runs inside the checkout
/// transaction)
pub async fn delete_lines_for_products<'e, E>(
    executor: E,
    user_id: i64,
    product_ids: &[i64],
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = ANY($2)")
        .bind(user_id)
        .bind(product_ids)
        .execute(executor)
        .await?;
    Ok(())
}
