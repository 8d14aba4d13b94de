//! Cart endpoints
//!
//! Thin CRUD over the lines the checkout pipeline consumes.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::Identity;
use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::now_millis;

use super::ApiResult;

/// GET /api/cart
pub async fn list_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<db::cart::CartLineSnapshot>> {
    let lines = db::cart::list_snapshot(&state.pool, identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Cart query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;
    Ok(Json(lines))
}

/// POST /api/cart
#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

pub async fn add_line(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AddLineRequest>,
) -> ApiResult<serde_json::Value> {
    if req.quantity <= 0 {
        return Err(AppError::validation("quantity must be positive"));
    }

    let product = db::products::find_by_id(&state.pool, req.product_id)
        .await
        .map_err(|e| {
            tracing::error!("Product query error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if !product.is_active {
        return Err(AppError::new(ErrorCode::ProductInactive));
    }

    db::cart::upsert_line(
        &state.pool,
        identity.user_id,
        req.product_id,
        req.quantity,
        now_millis(),
    )
    .await
    .map_err(|e| {
        tracing::error!("Cart upsert error: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    Ok(Json(serde_json::json!({ "added": true })))
}

/// DELETE /api/cart/{product_id}
pub async fn remove_line(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let removed = db::cart::delete_line(&state.pool, identity.user_id, product_id)
        .await
        .map_err(|e| {
            tracing::error!("Cart delete error: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;
    if !removed {
        return Err(AppError::not_found("Cart line"));
    }
    Ok(Json(serde_json::json!({ "removed": true })))
}
