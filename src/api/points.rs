//! Points endpoint: balance + recent ledger entries

use axum::{Extension, Json, extract::State};
use serde::Serialize;

use crate::auth::Identity;
use crate::db;
use crate::db::points::PointsTransaction;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

use super::ApiResult;

const RECENT_TRANSACTIONS: i64 = 50;

#[derive(Serialize)]
pub struct PointsView {
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub transactions: Vec<PointsTransaction>,
}

/// GET /api/points
pub async fn get_points(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<PointsView> {
    let account = db::points::get_account(&state.pool, identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Points query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;

    let transactions =
        db::points::list_transactions(&state.pool, identity.user_id, RECENT_TRANSACTIONS)
            .await
            .map_err(|e| {
                tracing::error!("Points ledger query error: {e}");
                AppError::new(ErrorCode::InternalError)
            })?;

    let view = match account {
        Some(a) => PointsView {
            balance: a.balance,
            total_earned: a.total_earned,
            total_redeemed: a.total_redeemed,
            transactions,
        },
        None => PointsView {
            balance: 0,
            total_earned: 0,
            total_redeemed: 0,
            transactions,
        },
    };
    Ok(Json(view))
}
