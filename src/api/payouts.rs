//! Payout endpoints: balance, history, request

use axum::{Extension, Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::Identity;
use crate::db;
use crate::db::payouts::PayoutRow;
use crate::error::{AppError, ErrorCode};
use crate::payout::{self, PayoutRequest};
use crate::state::AppState;

use super::ApiResult;

#[derive(Serialize)]
pub struct BalanceView {
    pub settled_net: Decimal,
    pub completed_payouts: Decimal,
    pub in_flight_payouts: Decimal,
    pub available: Decimal,
    pub currency: &'static str,
}

/// GET /api/retailer/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<BalanceView> {
    let retailer_id = identity.require_retailer()?;
    let breakdown = payout::balance_for_retailer(&state, retailer_id)
        .await
        .map_err(AppError::from)?;
    Ok(Json(BalanceView {
        settled_net: breakdown.settled_net,
        completed_payouts: breakdown.completed_payouts,
        in_flight_payouts: breakdown.in_flight_payouts,
        available: breakdown.available(),
        currency: "GBP",
    }))
}

/// GET /api/retailer/payouts
pub async fn list_payouts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<PayoutRow>> {
    let retailer_id = identity.require_retailer()?;
    let payouts = db::payouts::list_for_retailer(&state.pool, retailer_id)
        .await
        .map_err(|e| {
            tracing::error!("Payouts query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;
    Ok(Json(payouts))
}

/// POST /api/retailer/payouts
pub async fn request_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PayoutRequest>,
) -> ApiResult<PayoutRow> {
    let retailer_id = identity.require_retailer()?;
    let payout = payout::request_payout(&state, retailer_id, &req)
        .await
        .map_err(AppError::from)?;
    Ok(Json(payout))
}
