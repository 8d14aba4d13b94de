//! Payment processor webhook handler
//!
//! POST /psp/webhook — raw body for HMAC signature verification. Delivery is
//! at-least-once and unordered; every branch below is idempotent.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::state::AppState;
use crate::util::now_millis;
use crate::{db, psp, settlement};

/// Handle incoming processor events
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Signature header
    let sig_header = match headers.get("psp-signature").and_then(|v| v.to_str().ok()) {
        Some(s) => s,
        None => {
            tracing::warn!("Missing psp-signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. Verify signature against the raw body
    if let Err(e) = psp::verify_webhook_signature(&body, sig_header, &state.psp.webhook_secret) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type = event_type, "Received processor webhook");

    // 4. Idempotency: INSERT first, check rows_affected (eliminates TOCTOU race)
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };

    match db::webhook_events::record(&state.pool, event_id, event_type, now_millis()).await {
        Ok(false) => {
            tracing::info!(event_id = event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {} // New event, proceed
    }

    // 5. Handle event types
    match event_type {
        "checkout.session.completed" => handle_session_completed(&state, &event).await,
        "payment_intent.succeeded" => handle_payment_succeeded(&state, &event).await,
        "account.updated" => handle_account_updated(&state, &event).await,
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    }
}

fn event_object(event: &serde_json::Value) -> Option<&serde_json::Value> {
    event.get("data").and_then(|d| d.get("object"))
}

fn order_group_id(obj: &serde_json::Value) -> Option<i64> {
    obj.get("metadata")
        .and_then(|m| m["order_group_id"].as_str())
        .and_then(|s| s.parse().ok())
}

/// checkout.session.completed → pending group moves to processing
async fn handle_session_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event_object(event) else {
        return StatusCode::OK;
    };

    let session_id = match obj["id"].as_str() {
        Some(s) => s,
        None => {
            tracing::warn!("checkout.session.completed missing id");
            return StatusCode::OK;
        }
    };
    let Some(group_id) = order_group_id(obj) else {
        tracing::warn!(session_id, "checkout.session.completed without order_group_id");
        return StatusCode::OK;
    };

    match settlement::session_completed(state, group_id, session_id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = ?e, group_id, "Failed to apply session completion");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// payment_intent.succeeded → settle the group with the payment-time rate
async fn handle_payment_succeeded(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event_object(event) else {
        return StatusCode::OK;
    };

    let payment_id = match obj["id"].as_str() {
        Some(s) => s,
        None => {
            tracing::warn!("payment_intent.succeeded missing id");
            return StatusCode::OK;
        }
    };
    let Some(group_id) = order_group_id(obj) else {
        tracing::warn!(payment_id, "payment_intent.succeeded without order_group_id");
        return StatusCode::OK;
    };

    match settlement::payment_succeeded(state, group_id, payment_id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = ?e, group_id, "Failed to apply settlement");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// account.updated → destination eligibility only, never order state
async fn handle_account_updated(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event_object(event) else {
        return StatusCode::OK;
    };

    let account_ref = match obj["id"].as_str() {
        Some(s) => s,
        None => return StatusCode::OK,
    };
    let charges_enabled = obj["charges_enabled"].as_bool().unwrap_or(false);
    let payouts_enabled = obj["payouts_enabled"].as_bool().unwrap_or(false);
    let details_submitted = obj["details_submitted"].as_bool().unwrap_or(false);

    match settlement::account_updated(
        state,
        account_ref,
        charges_enabled,
        payouts_enabled,
        details_submitted,
    )
    .await
    {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = ?e, account_ref, "Failed to update account eligibility");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
