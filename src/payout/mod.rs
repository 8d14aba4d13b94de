//! Payout balance calculation and transfer execution
//!
//! The balance check and the payout insert run in one transaction holding a
//! row lock on the retailer, so two concurrent requests cannot both observe
//! the pre-debit balance and jointly overdraw it. The external transfer runs
//! strictly after commit: a transfer failure marks the payout failed and is
//! never retried automatically, because the side effect of a timed-out call
//! may already have landed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::payouts::{NewPayout, PayoutRow};
use crate::error::{AppError, ErrorCode, ServiceError, ServiceResult};
use crate::money::{self, parse_currency, round_money};
use crate::psp;
use crate::state::AppState;
use crate::util::now_millis;

/// The three aggregates behind a retailer's available balance, all in the
/// base currency
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceBreakdown {
    pub settled_net: Decimal,
    pub completed_payouts: Decimal,
    pub in_flight_payouts: Decimal,
}

impl BalanceBreakdown {
    /// settled revenue − completed payouts − in-flight payouts, floored at 0
    pub fn available(&self) -> Decimal {
        (self.settled_net - self.completed_payouts - self.in_flight_payouts).max(Decimal::ZERO)
    }
}

#[derive(Debug, Deserialize)]
pub struct PayoutRequest {
    pub amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
}

/// Read-only balance view (no lock; the authoritative check happens inside
/// the payout transaction)
pub async fn balance_for_retailer(
    state: &AppState,
    retailer_id: i64,
) -> ServiceResult<BalanceBreakdown> {
    let mut conn = state.pool.acquire().await?;
    read_breakdown(&mut conn, retailer_id).await
}

async fn read_breakdown(
    conn: &mut sqlx::PgConnection,
    retailer_id: i64,
) -> ServiceResult<BalanceBreakdown> {
    Ok(BalanceBreakdown {
        settled_net: db::payouts::sum_settled_net(conn, retailer_id).await?,
        completed_payouts: db::payouts::sum_completed_payouts(conn, retailer_id).await?,
        in_flight_payouts: db::payouts::sum_in_flight_payouts(conn, retailer_id).await?,
    })
}

/// Request a payout: validate, convert to base, check the balance under lock,
/// insert, then attempt the external transfer.
pub async fn request_payout(
    state: &AppState,
    retailer_id: i64,
    req: &PayoutRequest,
) -> ServiceResult<PayoutRow> {
    if req.amount <= Decimal::ZERO {
        return Err(AppError::validation("payout amount must be positive").into());
    }
    let currency = parse_currency(&req.currency)?;
    let requested = round_money(req.amount);
    let base_amount = money::to_base(requested, currency);

    // Transfers need a payout-enabled destination; reject before creating
    // anything
    let account = db::payment_accounts::find_by_retailer(&state.pool, retailer_id)
        .await?
        .filter(|a| a.can_receive_payouts())
        .ok_or_else(|| AppError::new(ErrorCode::PaymentAccountIneligible))?;

    // Balance evaluation vs. concurrent requests: serialize on the retailer
    // row before comparing requested amount to available balance
    let mut tx = state.pool.begin().await?;
    if !db::payouts::lock_retailer(&mut *tx, retailer_id).await? {
        return Err(AppError::not_found("Retailer").into());
    }
    let breakdown = read_breakdown(&mut *tx, retailer_id).await?;
    let available = breakdown.available();
    if base_amount > available {
        // Rejection creates no row
        return Err(AppError::new(ErrorCode::InsufficientBalance)
            .with_detail("requested_base", base_amount.to_string())
            .with_detail("available", available.to_string())
            .into());
    }

    let payout_id = db::payouts::insert(
        &mut *tx,
        &NewPayout {
            retailer_id,
            requested_amount: requested,
            requested_currency: currency.as_code(),
            base_amount,
            notes: req.notes.as_deref(),
            now: now_millis(),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        payout_id,
        retailer_id,
        %requested,
        currency = currency.as_code(),
        %base_amount,
        "Payout accepted"
    );

    // External transfer, outside the transaction
    let transfer = psp::create_transfer(
        &state.psp,
        &account.account_ref,
        money::to_minor_units(requested),
        currency.as_code().to_lowercase().as_str(),
        payout_id,
    )
    .await;

    match transfer {
        Ok(transfer_ref) => {
            db::payouts::mark_completed(&state.pool, payout_id, &transfer_ref, now_millis())
                .await?;
            tracing::info!(payout_id, transfer_ref = %transfer_ref, "Payout transfer completed");
        }
        Err(e) => {
            // No automatic retry: the transfer may have landed despite the
            // error, and a retry could pay twice
            tracing::error!(%e, payout_id, "Payout transfer failed");
            db::payouts::mark_failed(&state.pool, payout_id).await?;
        }
    }

    db::payouts::find_by_id(&state.pool, payout_id)
        .await?
        .ok_or_else(|| ServiceError::Db(format!("payout {payout_id} vanished").into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_available_balance_example() {
        // settled retailer-net £100.00, completed payout £40.00,
        // pending payout £20.00 → available £40.00
        let breakdown = BalanceBreakdown {
            settled_net: dec!(100.00),
            completed_payouts: dec!(40.00),
            in_flight_payouts: dec!(20.00),
        };
        assert_eq!(breakdown.available(), dec!(40.00));
    }

    #[test]
    fn test_available_floors_at_zero() {
        let breakdown = BalanceBreakdown {
            settled_net: dec!(10.00),
            completed_payouts: dec!(15.00),
            in_flight_payouts: dec!(0.00),
        };
        assert_eq!(breakdown.available(), dec!(0.00));
    }

    #[test]
    fn test_request_admission_boundary() {
        let breakdown = BalanceBreakdown {
            settled_net: dec!(100.00),
            completed_payouts: dec!(40.00),
            in_flight_payouts: dec!(20.00),
        };
        // £50.00 exceeds available £40.00; £40.00 exactly does not
        assert!(dec!(50.00) > breakdown.available());
        assert!(dec!(40.00) <= breakdown.available());
    }

    #[test]
    fn test_foreign_currency_admission() {
        // $100.00 → £79.00 base; admitted against an £80.00 balance
        let base = money::to_base(dec!(100.00), money::Currency::Usd);
        assert_eq!(base, dec!(79.00));
        let breakdown = BalanceBreakdown {
            settled_net: dec!(80.00),
            completed_payouts: Decimal::ZERO,
            in_flight_payouts: Decimal::ZERO,
        };
        assert!(base <= breakdown.available());
    }
}
