//! Settlement reconciliation
//!
//! Per-order-group state machine driven by verified processor events. Every
//! transition is idempotent and keyed by external ids, so at-least-once,
//! unordered webhook delivery (and the reconciliation sweep replaying the
//! same facts) converges on the same state.

pub mod reconcile;

use rust_decimal::Decimal;

use crate::db;
use crate::error::ServiceResult;
use crate::money::round_money;
use crate::state::AppState;
use crate::util::now_millis;

/// Commission and retailer-net for a settled total at a given rate.
/// Derived once from (total, rate); recomputing with the same inputs always
/// yields the same outputs, which is what makes the settlement overwrite safe
/// to replay.
pub fn settle_amounts(total: Decimal, rate: Decimal) -> (Decimal, Decimal) {
    let commission = round_money(total * rate);
    (commission, total - commission)
}

/// checkout-completed: pending → processing, recording the session id
pub async fn session_completed(
    state: &AppState,
    group_id: i64,
    session_ref: &str,
) -> ServiceResult<()> {
    let moved =
        db::orders::mark_processing(&state.pool, group_id, session_ref, now_millis()).await?;
    if moved {
        tracing::info!(group_id, session_ref, "Order group moved to processing");
    } else {
        tracing::debug!(group_id, "Order group already past pending, event ignored");
    }
    Ok(())
}

/// payment-succeeded: recompute commission/retailer-net with the rate
/// effective at payment time and overwrite the derived fields, keyed by the
/// external payment id
pub async fn payment_succeeded(
    state: &AppState,
    group_id: i64,
    payment_ref: &str,
) -> ServiceResult<()> {
    let Some(group) = db::orders::find_by_id(&state.pool, group_id).await? else {
        tracing::warn!(group_id, "payment-succeeded for unknown order group");
        return Ok(());
    };

    // Replay of an already-applied payment: the stamp is immutable, a later
    // rate change must not leak into it
    if group.external_payment_ref.as_deref() == Some(payment_ref) {
        tracing::debug!(group_id, payment_ref, "Payment already settled, replay ignored");
        return Ok(());
    }

    let rate = db::settings::get_commission_rate(&state.pool).await?;
    let (commission, retailer_net) = settle_amounts(group.total, rate.commission_rate);

    db::orders::apply_settlement(
        &state.pool,
        group_id,
        payment_ref,
        rate.commission_rate,
        commission,
        retailer_net,
        now_millis(),
    )
    .await?;

    tracing::info!(
        group_id,
        payment_ref,
        %commission,
        %retailer_net,
        rate_version = rate.version,
        "Order group settled"
    );
    Ok(())
}

/// Destination-verification events touch the eligibility table only; order
/// group state is never involved
pub async fn account_updated(
    state: &AppState,
    account_ref: &str,
    charges_enabled: bool,
    payouts_enabled: bool,
    details_submitted: bool,
) -> ServiceResult<()> {
    let known = db::payment_accounts::update_eligibility(
        &state.pool,
        account_ref,
        charges_enabled,
        payouts_enabled,
        details_submitted,
        now_millis(),
    )
    .await?;
    if known {
        tracing::info!(
            account_ref,
            charges_enabled,
            payouts_enabled,
            "Destination account eligibility updated"
        );
    } else {
        tracing::debug!(account_ref, "Eligibility event for unknown account, ignored");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settle_amounts_basic() {
        let (commission, net) = settle_amounts(dec!(100.00), dec!(0.10));
        assert_eq!(commission, dec!(10.00));
        assert_eq!(net, dec!(90.00));
    }

    #[test]
    fn test_settle_amounts_rounding() {
        // 17.50 × 0.085 = 1.4875 → commission 1.49, net 16.01
        let (commission, net) = settle_amounts(dec!(17.50), dec!(0.085));
        assert_eq!(commission, dec!(1.49));
        assert_eq!(net, dec!(16.01));
        assert_eq!(commission + net, dec!(17.50));
    }

    #[test]
    fn test_settle_amounts_replay_is_identical() {
        // The settlement overwrite replays the same computation; equal inputs
        // must give equal outputs for replayed webhooks to be no-ops
        let first = settle_amounts(dec!(42.37), dec!(0.1250));
        let second = settle_amounts(dec!(42.37), dec!(0.1250));
        assert_eq!(first, second);
    }

    #[test]
    fn test_settle_amounts_zero_total() {
        let (commission, net) = settle_amounts(dec!(0.00), dec!(0.10));
        assert_eq!(commission, dec!(0.00));
        assert_eq!(net, dec!(0.00));
    }
}
