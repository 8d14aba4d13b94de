//! Retailer destination-account eligibility
//!
//! Written by onboarding and by account-verification webhooks only; never
//! touched by order or settlement state transitions.

use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentAccount {
    pub retailer_id: i64,
    pub account_ref: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

impl PaymentAccount {
    /// Eligible to receive a checkout session destination charge
    pub fn can_accept_charges(&self) -> bool {
        self.charges_enabled && self.details_submitted
    }

    /// Eligible to receive an outbound funds transfer
    pub fn can_receive_payouts(&self) -> bool {
        self.payouts_enabled && self.details_submitted
    }
}

pub async fn find_by_retailer(
    pool: &PgPool,
    retailer_id: i64,
) -> Result<Option<PaymentAccount>, sqlx::Error> {
    sqlx::query_as::<_, PaymentAccount>(
        "SELECT retailer_id, account_ref, charges_enabled, payouts_enabled, details_submitted
         FROM payment_accounts WHERE retailer_id = $1",
    )
    .bind(retailer_id)
    .fetch_optional(pool)
    .await
}

/// Apply a destination-verification event. Unknown account refs are ignored
/// (the retailer may not have finished onboarding on our side yet).
pub async fn update_eligibility(
    pool: &PgPool,
    account_ref: &str,
    charges_enabled: bool,
    payouts_enabled: bool,
    details_submitted: bool,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_accounts
         SET charges_enabled = $2, payouts_enabled = $3, details_submitted = $4, updated_at = $5
         WHERE account_ref = $1",
    )
    .bind(account_ref)
    .bind(charges_enabled)
    .bind(payouts_enabled)
    .bind(details_submitted)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
