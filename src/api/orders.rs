//! Order endpoints: buyer and retailer listings, retailer status updates

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::checkout;
use crate::db;
use crate::db::orders::{OrderGroupRow, OrderLineRow};
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

use super::ApiResult;

#[derive(Serialize)]
pub struct OrderGroupWithLines {
    #[serde(flatten)]
    pub group: OrderGroupRow,
    pub lines: Vec<OrderLineRow>,
}

async fn attach_lines(
    state: &AppState,
    groups: Vec<OrderGroupRow>,
) -> Result<Vec<OrderGroupWithLines>, sqlx::Error> {
    let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let mut lines = db::orders::lines_for_groups(&state.pool, &ids).await?;

    let mut by_group: std::collections::HashMap<i64, Vec<OrderLineRow>> =
        std::collections::HashMap::new();
    for line in lines.drain(..) {
        by_group.entry(line.order_group_id).or_default().push(line);
    }

    Ok(groups
        .into_iter()
        .map(|group| OrderGroupWithLines {
            lines: by_group.remove(&group.id).unwrap_or_default(),
            group,
        })
        .collect())
}

/// GET /api/orders — the buyer's order groups, newest first
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<OrderGroupWithLines>> {
    let groups = db::orders::list_for_user(&state.pool, identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Orders query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;
    let result = attach_lines(&state, groups).await.map_err(|e| {
        tracing::error!("Order lines query error: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;
    Ok(Json(result))
}

/// GET /api/retailer/orders
pub async fn list_retailer_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<OrderGroupWithLines>> {
    let retailer_id = identity.require_retailer()?;
    let groups = db::orders::list_for_retailer(&state.pool, retailer_id)
        .await
        .map_err(|e| {
            tracing::error!("Orders query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;
    let result = attach_lines(&state, groups).await.map_err(|e| {
        tracing::error!("Order lines query error: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;
    Ok(Json(result))
}

/// PATCH /api/retailer/orders/{id}/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<OrderGroupRow> {
    let retailer_id = identity.require_retailer()?;
    let group = checkout::update_order_status(&state, retailer_id, group_id, &req.status)
        .await
        .map_err(AppError::from)?;
    Ok(Json(group))
}
