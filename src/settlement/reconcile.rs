//! Webhook-loss reconciliation sweep
//!
//! Webhook delivery is at-least-once but not guaranteed: a group can sit in
//! `pending` forever if its completion event was lost. The sweep polls the
//! processor for the true session state of stale pending groups and applies
//! the same idempotent transitions the webhook would have.

use crate::db;
use crate::psp;
use crate::state::AppState;
use crate::util::now_millis;

/// How long a pending group with a session must sit before we ask the
/// processor about it
const STALE_AFTER_MS: i64 = 15 * 60 * 1000;

/// Groups examined per sweep
const SWEEP_LIMIT: i64 = 50;

pub async fn run_sweep(state: &AppState) {
    let cutoff = now_millis() - STALE_AFTER_MS;
    let stale = match db::orders::find_stale_pending(&state.pool, cutoff, SWEEP_LIMIT).await {
        Ok(groups) => groups,
        Err(e) => {
            tracing::error!(%e, "Reconciliation query failed");
            return;
        }
    };

    if stale.is_empty() {
        return;
    }
    tracing::info!(count = stale.len(), "Reconciling stale pending order groups");

    for group in stale {
        let Some(session_ref) = group.checkout_session_ref.as_deref() else {
            continue;
        };

        let session = match psp::fetch_checkout_session(&state.psp, session_ref).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%e, group_id = group.id, "Session status fetch failed");
                continue;
            }
        };

        if session.status == "complete" {
            if let Err(e) = super::session_completed(state, group.id, &session.id).await {
                tracing::error!(error = ?e, group_id = group.id, "Reconcile transition failed");
                continue;
            }
        }

        if session.payment_status == "paid" {
            if let Some(payment_ref) = session.payment_ref.as_deref() {
                if let Err(e) = super::payment_succeeded(state, group.id, payment_ref).await {
                    tracing::error!(error = ?e, group_id = group.id, "Reconcile settlement failed");
                }
            }
        }
    }
}
