//! Checkout endpoint

use axum::{Extension, Json, extract::State};

use crate::auth::Identity;
use crate::checkout::{self, CheckoutOutcome, CheckoutRequest};
use crate::error::AppError;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/checkout — materialize the cart into per-retailer order groups
/// and return them with hosted checkout redirect URLs
pub async fn create_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<CheckoutOutcome> {
    let outcome = checkout::create_orders(&state, identity.user_id, &identity.email, &req)
        .await
        .map_err(AppError::from)?;
    Ok(Json(outcome))
}
