//! Checkout pipeline: cart materialization → promotion allocation → order
//! ledger commit → hosted checkout sessions
//!
//! The ledger write is one serializable transaction; everything that talks to
//! the payment processor happens only after that transaction has committed,
//! so a failed external call leaves valid, sessionless orders rather than
//! rolling back a fiscally-committed checkout.

pub mod cart;
pub mod promotion;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::orders::{NewOrderGroup, OrderGroupRow, OrderLineRow};
use crate::error::{AppError, ErrorCode, ServiceError, ServiceResult};
use crate::money::{cashback_points, round_money, to_minor_units};
use crate::psp;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub discount_code: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedGroup {
    pub group: OrderGroupRow,
    pub lines: Vec<OrderLineRow>,
    /// Hosted checkout redirect, present when a session was created
    pub checkout_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub checkout_id: i64,
    pub groups: Vec<CreatedGroup>,
    /// Degradations that did not block the checkout (promotion not applied,
    /// missing destination account, session creation failure)
    pub warnings: Vec<String>,
}

/// Create per-retailer order groups from the buyer's cart.
pub async fn create_orders(
    state: &AppState,
    user_id: i64,
    buyer_email: &str,
    req: &CheckoutRequest,
) -> ServiceResult<CheckoutOutcome> {
    let now = now_millis();
    let mut warnings: Vec<String> = Vec::new();

    // 1. Materialize: price/stock snapshot, grouped by retailer
    let snapshot = db::cart::list_snapshot(&state.pool, user_id).await?;
    let carts = cart::materialize(snapshot)?;
    let combined_total: Decimal = carts.iter().map(|c| c.subtotal).sum();

    // 2. Resolve promotion inputs against current state
    let mut discount_total = Decimal::ZERO;
    let mut discount_code_id: Option<i64> = None;
    if let Some(code_str) = req.discount_code.as_deref() {
        match db::discounts::find_by_code(&state.pool, code_str).await? {
            Some(code) => match promotion::compute_discount(&code, combined_total, now) {
                Ok(amount) => {
                    discount_total = amount;
                    discount_code_id = Some(code.id);
                }
                Err(e) => warnings.push(format!("discount not applied: {}", e.message)),
            },
            None => warnings.push(format!("discount not applied: unknown code {code_str}")),
        }
    }

    let requested_points = req.points.unwrap_or(0);
    if requested_points < 0 {
        return Err(AppError::validation("points must not be negative").into());
    }
    let mut points_total = 0;
    if requested_points > 0 {
        let balance = db::points::get_balance(&state.pool, user_id).await?;
        points_total =
            promotion::cap_points(requested_points, balance, combined_total - discount_total);
        if points_total < requested_points {
            warnings.push(format!(
                "points redemption capped at {points_total} of {requested_points} requested"
            ));
        }
    }

    // 3. Ledger write: claims, groups, lines, stock, cart in one transaction
    let mut tx = state.pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    // Promotion claims are best-effort: losing a concurrent race degrades the
    // checkout to its pre-discount amount instead of aborting it
    if let Some(code_id) = discount_code_id {
        if !db::discounts::claim_usage(&mut *tx, code_id).await? {
            discount_total = Decimal::ZERO;
            warnings.push("discount not applied: usage limit reached".to_string());
        }
    }
    if points_total > 0 && !db::points::debit(&mut *tx, user_id, points_total).await? {
        points_total = 0;
        warnings.push("points not applied: balance changed".to_string());
    }

    let subtotals: Vec<Decimal> = carts.iter().map(|c| c.subtotal).collect();
    let allocations = promotion::allocate(&subtotals, discount_total, points_total);

    let checkout_id = db::orders::insert_checkout(&mut *tx, user_id, now).await?;
    let mut group_ids: Vec<i64> = Vec::with_capacity(carts.len());
    let mut all_product_ids: Vec<i64> = Vec::new();

    for (retailer_cart, alloc) in carts.iter().zip(&allocations) {
        let group_id = snowflake_id();
        db::orders::insert_group(
            &mut *tx,
            &NewOrderGroup {
                id: group_id,
                checkout_id,
                user_id,
                retailer_id: retailer_cart.retailer_id,
                subtotal: retailer_cart.subtotal,
                discount_amount: alloc.discount,
                points_used: alloc.points,
                total: alloc.total,
                now,
            },
        )
        .await?;

        let lines: Vec<(i64, String, i32, Decimal, Decimal)> = retailer_cart
            .lines
            .iter()
            .map(|l| {
                (
                    l.product_id,
                    l.product_name.clone(),
                    l.quantity,
                    l.unit_price,
                    round_money(l.unit_price * Decimal::from(l.quantity)),
                )
            })
            .collect();
        db::orders::insert_lines(&mut *tx, group_id, &lines).await?;

        for line in &retailer_cart.lines {
            if !db::products::decrement_stock(&mut *tx, line.product_id, line.quantity, now).await?
            {
                // Lost the stock race after the snapshot read: the dropped
                // transaction rolls everything back and the checkout aborts
                let available: i32 = sqlx::query_scalar(
                    "SELECT COALESCE(quantity, 0) FROM stock_units WHERE product_id = $1",
                )
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0);
                return Err(
                    AppError::out_of_stock(line.product_id, available, line.quantity).into(),
                );
            }
            all_product_ids.push(line.product_id);
        }

        if alloc.points > 0 {
            db::points::insert_transaction(
                &mut *tx,
                user_id,
                "redeemed",
                alloc.points,
                Some(group_id),
                now,
            )
            .await?;
        }

        group_ids.push(group_id);
    }

    db::cart::delete_lines_for_products(&mut *tx, user_id, &all_product_ids).await?;
    tx.commit().await?;

    tracing::info!(
        checkout_id,
        user_id,
        groups = group_ids.len(),
        %combined_total,
        "Checkout committed"
    );

    // 4. Cashback accrues immediately on order creation, independent of
    //    settlement
    accrue_cashback(state, user_id, &group_ids, &allocations, now).await;

    // 5. Hosted checkout sessions, after local commit
    let session_urls =
        create_sessions(state, buyer_email, &group_ids, &carts, &mut warnings).await?;

    // 6. Assemble the outcome from the stamped rows
    let all_lines = db::orders::lines_for_groups(&state.pool, &group_ids).await?;
    let mut groups = Vec::with_capacity(group_ids.len());
    for (idx, group_id) in group_ids.iter().enumerate() {
        let group = db::orders::find_by_id(&state.pool, *group_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Db(format!("order group {group_id} vanished after commit").into())
            })?;
        let lines = all_lines
            .iter()
            .filter(|l| l.order_group_id == *group_id)
            .cloned()
            .collect();
        groups.push(CreatedGroup {
            group,
            lines,
            checkout_url: session_urls[idx].clone(),
        });
    }

    Ok(CheckoutOutcome {
        checkout_id,
        groups,
        warnings,
    })
}

/// Credit 1% cashback per group. Failures are logged, never surfaced; the
/// orders are already committed.
async fn accrue_cashback(
    state: &AppState,
    user_id: i64,
    group_ids: &[i64],
    allocations: &[promotion::GroupAllocation],
    now: i64,
) {
    for (group_id, alloc) in group_ids.iter().zip(allocations) {
        let earned = cashback_points(alloc.total);
        if earned == 0 {
            continue;
        }
        let result: Result<(), sqlx::Error> = async {
            db::points::credit(&state.pool, user_id, earned).await?;
            db::points::insert_transaction(
                &state.pool,
                user_id,
                "earned",
                earned,
                Some(*group_id),
                now,
            )
            .await?;
            db::orders::stamp_points_earned(&state.pool, *group_id, earned, now).await?;
            Ok(())
        }
        .await;
        if let Err(e) = result {
            tracing::error!(%e, group_id, "Cashback accrual failed");
        }
    }
}

/// Create one hosted checkout session per eligible group. The commission rate
/// is read fresh here and stamped onto the group, so later rate changes apply
/// only to new checkouts.
async fn create_sessions(
    state: &AppState,
    buyer_email: &str,
    group_ids: &[i64],
    carts: &[cart::RetailerCart],
    warnings: &mut Vec<String>,
) -> ServiceResult<Vec<Option<String>>> {
    let rate = db::settings::get_commission_rate(&state.pool).await?;
    let now = now_millis();
    let mut urls: Vec<Option<String>> = Vec::with_capacity(group_ids.len());

    for (group_id, retailer_cart) in group_ids.iter().zip(carts) {
        let account =
            db::payment_accounts::find_by_retailer(&state.pool, retailer_cart.retailer_id).await?;
        let account = match account {
            Some(a) if a.can_accept_charges() => a,
            _ => {
                warnings.push(format!(
                    "retailer {} has no charge-enabled destination account; order group {} created without a checkout session",
                    retailer_cart.retailer_id, group_id
                ));
                urls.push(None);
                continue;
            }
        };

        let group = match db::orders::find_by_id(&state.pool, *group_id).await? {
            Some(g) => g,
            None => {
                urls.push(None);
                continue;
            }
        };
        let commission = round_money(group.total * rate.commission_rate);
        let retailer_net = group.total - commission;

        let params = psp::CheckoutSessionParams {
            amount_minor: to_minor_units(group.total),
            currency: "gbp",
            application_fee_minor: to_minor_units(commission),
            destination_account: &account.account_ref,
            buyer_email,
            order_group_id: *group_id,
            success_url: &state.checkout_success_url,
            cancel_url: &state.checkout_cancel_url,
        };

        match psp::create_checkout_session(&state.psp, &params).await {
            Ok(session) => {
                db::orders::stamp_session(
                    &state.pool,
                    *group_id,
                    &session.id,
                    rate.commission_rate,
                    commission,
                    retailer_net,
                    now,
                )
                .await?;
                urls.push(Some(session.url));
            }
            Err(e) => {
                // Order and stock are already committed; surface as a warning
                // and leave the group for reconciliation
                tracing::warn!(%e, group_id, "Checkout session creation failed");
                warnings.push(format!(
                    "checkout session could not be created for order group {group_id}"
                ));
                urls.push(None);
            }
        }
    }

    Ok(urls)
}

/// Retailer-driven order status update: enum-constrained, monotonic forward,
/// cancellation only while pending.
pub async fn update_order_status(
    state: &AppState,
    retailer_id: i64,
    group_id: i64,
    new_status: &str,
) -> ServiceResult<OrderGroupRow> {
    use crate::db::orders::OrderStatus;

    let to = OrderStatus::from_db(new_status)
        .ok_or_else(|| AppError::validation(format!("unknown order status: {new_status}")))?;

    let group = db::orders::find_by_id(&state.pool, group_id)
        .await?
        .filter(|g| g.retailer_id == retailer_id)
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let from = OrderStatus::from_db(&group.status)
        .ok_or_else(|| AppError::internal(format!("corrupt order status: {}", group.status)))?;

    if !from.can_transition_to(to) {
        let code = if from == OrderStatus::Cancelled {
            ErrorCode::OrderAlreadyCancelled
        } else {
            ErrorCode::InvalidStatusTransition
        };
        return Err(AppError::new(code)
            .with_detail("from", from.as_db())
            .with_detail("to", to.as_db())
            .into());
    }

    let updated =
        db::orders::update_status_guarded(&state.pool, group_id, retailer_id, from, to, now_millis())
            .await?;
    if !updated {
        // Someone else moved the group between our read and our write
        return Err(AppError::new(ErrorCode::Conflict).into());
    }

    db::orders::find_by_id(&state.pool, group_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).into())
}
