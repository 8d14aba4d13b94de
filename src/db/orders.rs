//! Order group and order line storage
//!
//! An order group is one retailer's slice of a multi-retailer checkout: the
//! unit of settlement. Its monetary fields are written once at creation and
//! overwritten exactly once by settlement; never incremented.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::util::snowflake_id;

/// Order group lifecycle. Transitions are monotonic forward only, plus
/// cancellation while still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    /// Forward-only transitions; cancellation only before processing starts
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Cancelled) => true,
            (_, Self::Cancelled) => false,
            (Self::Cancelled, _) => false,
            (from, to) => to.rank() == from.rank() + 1,
        }
    }

    /// Groups that count toward a retailer's settled revenue: payment has
    /// been confirmed and the group was not cancelled
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Processing | Self::Shipped | Self::Delivered)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct OrderGroupRow {
    pub id: i64,
    pub checkout_id: i64,
    pub user_id: i64,
    pub retailer_id: i64,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub points_used: i64,
    pub points_earned: i64,
    pub total: Decimal,
    pub status: String,
    pub commission_rate: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub retailer_net: Option<Decimal>,
    pub checkout_session_ref: Option<String>,
    pub external_payment_ref: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct OrderLineRow {
    pub id: i64,
    pub order_group_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

const GROUP_COLUMNS: &str = "id, checkout_id, user_id, retailer_id, subtotal, discount_amount, \
     points_used, points_earned, total, status, commission_rate, commission, retailer_net, \
     checkout_session_ref, external_payment_ref, created_at, updated_at";

/// New-group insert values (runs inside the checkout transaction)
pub struct NewOrderGroup {
    pub id: i64,
    pub checkout_id: i64,
    pub user_id: i64,
    pub retailer_id: i64,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub points_used: i64,
    pub total: Decimal,
    pub now: i64,
}

pub async fn insert_checkout<'e, E>(executor: E, user_id: i64, now: i64) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let id = snowflake_id();
    sqlx::query("INSERT INTO checkouts (id, user_id, created_at) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(executor)
        .await?;
    Ok(id)
}

pub async fn insert_group<'e, E>(executor: E, group: &NewOrderGroup) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        "INSERT INTO order_groups (
            id, checkout_id, user_id, retailer_id, subtotal, discount_amount,
            points_used, points_earned, total, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, 'pending', $9, $9)",
    )
    .bind(group.id)
    .bind(group.checkout_id)
    .bind(group.user_id)
    .bind(group.retailer_id)
    .bind(group.subtotal)
    .bind(group.discount_amount)
    .bind(group.points_used)
    .bind(group.total)
    .bind(group.now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Batch-insert the group's lines with their immutable price snapshots
pub async fn insert_lines<'e, E>(
    executor: E,
    order_group_id: i64,
    lines: &[(i64, String, i32, Decimal, Decimal)],
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    if lines.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = lines.iter().map(|_| snowflake_id()).collect();
    let group_ids: Vec<i64> = lines.iter().map(|_| order_group_id).collect();
    let product_ids: Vec<i64> = lines.iter().map(|l| l.0).collect();
    let names: Vec<String> = lines.iter().map(|l| l.1.clone()).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.2).collect();
    let unit_prices: Vec<Decimal> = lines.iter().map(|l| l.3).collect();
    let line_totals: Vec<Decimal> = lines.iter().map(|l| l.4).collect();
    sqlx::query(
        "INSERT INTO order_lines (id, order_group_id, product_id, product_name, quantity, unit_price, line_total)
         SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::text[], $5::integer[], $6::numeric[], $7::numeric[])",
    )
    .bind(&ids)
    .bind(&group_ids)
    .bind(&product_ids)
    .bind(&names)
    .bind(&quantities)
    .bind(&unit_prices)
    .bind(&line_totals)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn stamp_points_earned(
    pool: &PgPool,
    group_id: i64,
    points_earned: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE order_groups SET points_earned = $2, updated_at = $3 WHERE id = $1")
        .bind(group_id)
        .bind(points_earned)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<OrderGroupRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM order_groups WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<OrderGroupRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM order_groups WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_retailer(
    pool: &PgPool,
    retailer_id: i64,
) -> Result<Vec<OrderGroupRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM order_groups WHERE retailer_id = $1 ORDER BY created_at DESC"
    ))
    .bind(retailer_id)
    .fetch_all(pool)
    .await
}

pub async fn lines_for_groups(
    pool: &PgPool,
    group_ids: &[i64],
) -> Result<Vec<OrderLineRow>, sqlx::Error> {
    if group_ids.is_empty() {
        return Ok(vec![]);
    }
    sqlx::query_as::<_, OrderLineRow>(
        "SELECT id, order_group_id, product_id, product_name, quantity, unit_price, line_total
         FROM order_lines WHERE order_group_id = ANY($1)",
    )
    .bind(group_ids)
    .fetch_all(pool)
    .await
}

/// Stamp the checkout-session reference and the commission computed at
/// session-creation time
pub async fn stamp_session(
    pool: &PgPool,
    group_id: i64,
    session_ref: &str,
    commission_rate: Decimal,
    commission: Decimal,
    retailer_net: Decimal,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE order_groups
         SET checkout_session_ref = $2, commission_rate = $3, commission = $4,
             retailer_net = $5, updated_at = $6
         WHERE id = $1",
    )
    .bind(group_id)
    .bind(session_ref)
    .bind(commission_rate)
    .bind(commission)
    .bind(retailer_net)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// checkout-completed transition: pending → processing, recording the session
/// id. The status guard makes replays and late deliveries no-ops.
pub async fn mark_processing(
    pool: &PgPool,
    group_id: i64,
    session_ref: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE order_groups
         SET status = 'processing', checkout_session_ref = $2, updated_at = $3
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(group_id)
    .bind(session_ref)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// payment-succeeded settlement: overwrite the derived fields keyed by the
/// external payment id. A pure overwrite: replaying the same payment yields
/// identical state. Promotes pending → processing if the completion event was
/// lost or has not arrived yet; later statuses are left alone.
pub async fn apply_settlement(
    pool: &PgPool,
    group_id: i64,
    payment_ref: &str,
    commission_rate: Decimal,
    commission: Decimal,
    retailer_net: Decimal,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE order_groups
         SET external_payment_ref = $2, commission_rate = $3, commission = $4,
             retailer_net = $5,
             status = CASE WHEN status = 'pending' THEN 'processing' ELSE status END,
             updated_at = $6
         WHERE id = $1",
    )
    .bind(group_id)
    .bind(payment_ref)
    .bind(commission_rate)
    .bind(commission)
    .bind(retailer_net)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Guarded status update for the retailer surface: the WHERE clause pins the
/// expected current status, so a concurrent transition loses cleanly
pub async fn update_status_guarded(
    pool: &PgPool,
    group_id: i64,
    retailer_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE order_groups SET status = $4, updated_at = $5
         WHERE id = $1 AND retailer_id = $2 AND status = $3",
    )
    .bind(group_id)
    .bind(retailer_id)
    .bind(from.as_db())
    .bind(to.as_db())
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Groups still pending with a session reference created before `cutoff`,
/// the candidates for webhook-loss reconciliation
pub async fn find_stale_pending(
    pool: &PgPool,
    cutoff: i64,
    limit: i64,
) -> Result<Vec<OrderGroupRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM order_groups
         WHERE status = 'pending' AND checkout_session_ref IS NOT NULL AND created_at < $1
         ORDER BY created_at
         LIMIT $2"
    ))
    .bind(cutoff)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_db(s.as_db()), Some(s));
        }
        assert_eq!(OrderStatus::from_db("refunded"), None);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_cancellation_only_from_pending() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_settled_statuses() {
        assert!(!OrderStatus::Pending.is_settled());
        assert!(OrderStatus::Processing.is_settled());
        assert!(OrderStatus::Shipped.is_settled());
        assert!(OrderStatus::Delivered.is_settled());
        assert!(!OrderStatus::Cancelled.is_settled());
    }
}
