//! Promotion allocation
//!
//! Resolves a discount code and a points redemption into per-group
//! deductions. With multiple retailer groups the deductions split evenly by
//! group count, not by subtotal. Per-group net
//! floors at zero, never negative.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::db::discounts::{DiscountCode, DiscountKind};
use crate::error::{AppError, ErrorCode};
use crate::money::{max_points_within, points_value, round_money};

/// Validate a discount code against the combined cart total and compute the
/// single absolute discount amount it grants.
pub fn compute_discount(
    code: &DiscountCode,
    combined_total: Decimal,
    now: i64,
) -> Result<Decimal, AppError> {
    if !code.is_active {
        return Err(AppError::new(ErrorCode::DiscountInvalid));
    }
    if now < code.valid_from || now > code.valid_until {
        return Err(AppError::new(ErrorCode::DiscountExpired));
    }
    if let Some(limit) = code.usage_limit {
        if code.used_count >= limit {
            return Err(AppError::new(ErrorCode::DiscountUsageExhausted));
        }
    }
    if combined_total < code.min_purchase {
        return Err(AppError::new(ErrorCode::DiscountMinPurchase)
            .with_detail("min_purchase", code.min_purchase.to_string()));
    }

    let kind = DiscountKind::from_db(&code.kind)
        .ok_or_else(|| AppError::new(ErrorCode::DiscountInvalid))?;

    let amount = match kind {
        DiscountKind::Percentage => {
            let raw = round_money(combined_total * code.value / dec!(100));
            match code.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountKind::Fixed => code.value,
    };

    // A discount can never exceed what is being bought
    Ok(amount.min(combined_total).max(Decimal::ZERO))
}

/// Cap a requested points redemption at the buyer's balance and at the value
/// still payable after the discount.
pub fn cap_points(requested: i64, balance: i64, remaining_total: Decimal) -> i64 {
    requested
        .max(0)
        .min(balance)
        .min(max_points_within(remaining_total))
}

/// Split a monetary amount evenly across `n` groups. All groups but the last
/// receive the 2-dp-floored even share; the last takes the remainder, so the
/// shares always sum to the original amount.
pub fn split_amount_by_count(total: Decimal, n: usize) -> Vec<Decimal> {
    if n == 0 {
        return vec![];
    }
    let count = Decimal::from(n as u64);
    let share = (total / count).round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero);
    let mut shares = vec![share; n];
    shares[n - 1] = total - share * Decimal::from((n - 1) as u64);
    shares
}

/// Split a points quantity evenly across `n` groups, spreading the remainder
/// one point per group from the front.
pub fn split_points_by_count(points: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return vec![];
    }
    let base = points / n as i64;
    let rem = points % n as i64;
    (0..n as i64)
        .map(|i| if i < rem { base + 1 } else { base })
        .collect()
}

/// Per-group deduction outcome
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAllocation {
    pub discount: Decimal,
    pub points: i64,
    pub total: Decimal,
}

/// Allocate the checkout-level discount and points redemption across the
/// retailer groups. Each group's deductions clamp at its own subtotal, so the
/// group total never goes negative; clamped-off remainder is forfeited.
pub fn allocate(subtotals: &[Decimal], discount: Decimal, points: i64) -> Vec<GroupAllocation> {
    let discount_shares = split_amount_by_count(discount, subtotals.len());
    let points_shares = split_points_by_count(points, subtotals.len());

    subtotals
        .iter()
        .zip(discount_shares)
        .zip(points_shares)
        .map(|((&subtotal, discount_share), points_share)| {
            let discount = discount_share.min(subtotal);
            let remaining = subtotal - discount;
            let points = points_share.min(max_points_within(remaining));
            let total = subtotal - discount - points_value(points);
            GroupAllocation {
                discount,
                points,
                total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_code(value: Decimal) -> DiscountCode {
        DiscountCode {
            id: 1,
            code: "SAVE5".into(),
            kind: DiscountKind::Fixed.as_db().into(),
            value,
            min_purchase: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: 0,
            valid_until: i64::MAX,
            is_active: true,
        }
    }

    fn percentage_code(value: Decimal, max_discount: Option<Decimal>) -> DiscountCode {
        DiscountCode {
            kind: DiscountKind::Percentage.as_db().into(),
            value,
            max_discount,
            ..fixed_code(Decimal::ZERO)
        }
    }

    #[test]
    fn test_fixed_discount() {
        let amount = compute_discount(&fixed_code(dec!(5.00)), dec!(25.00), 1000).unwrap();
        assert_eq!(amount, dec!(5.00));
    }

    #[test]
    fn test_fixed_discount_capped_at_total() {
        let amount = compute_discount(&fixed_code(dec!(50.00)), dec!(25.00), 1000).unwrap();
        assert_eq!(amount, dec!(25.00));
    }

    #[test]
    fn test_percentage_discount_with_cap() {
        let code = percentage_code(dec!(10), Some(dec!(3.00)));
        assert_eq!(compute_discount(&code, dec!(20.00), 1000).unwrap(), dec!(2.00));
        assert_eq!(compute_discount(&code, dec!(80.00), 1000).unwrap(), dec!(3.00));
    }

    #[test]
    fn test_inactive_code_rejected() {
        let mut code = fixed_code(dec!(5.00));
        code.is_active = false;
        let err = compute_discount(&code, dec!(25.00), 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscountInvalid);
    }

    #[test]
    fn test_validity_window() {
        let mut code = fixed_code(dec!(5.00));
        code.valid_from = 100;
        code.valid_until = 200;
        assert!(compute_discount(&code, dec!(25.00), 150).is_ok());
        assert_eq!(
            compute_discount(&code, dec!(25.00), 50).unwrap_err().code,
            ErrorCode::DiscountExpired
        );
        assert_eq!(
            compute_discount(&code, dec!(25.00), 250).unwrap_err().code,
            ErrorCode::DiscountExpired
        );
    }

    #[test]
    fn test_usage_limit_exhausted() {
        let mut code = fixed_code(dec!(5.00));
        code.usage_limit = Some(1);
        code.used_count = 1;
        let err = compute_discount(&code, dec!(25.00), 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscountUsageExhausted);
    }

    #[test]
    fn test_min_purchase() {
        let mut code = fixed_code(dec!(5.00));
        code.min_purchase = dec!(30.00);
        let err = compute_discount(&code, dec!(25.00), 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscountMinPurchase);
        assert!(compute_discount(&code, dec!(30.00), 1000).is_ok());
    }

    #[test]
    fn test_cap_points() {
        assert_eq!(cap_points(500, 1000, dec!(20.00)), 500);
        assert_eq!(cap_points(500, 300, dec!(20.00)), 300);
        // only £2.50 payable → at most 250 points
        assert_eq!(cap_points(500, 1000, dec!(2.50)), 250);
        assert_eq!(cap_points(-5, 1000, dec!(20.00)), 0);
    }

    #[test]
    fn test_split_amount_even() {
        assert_eq!(
            split_amount_by_count(dec!(5.00), 2),
            vec![dec!(2.50), dec!(2.50)]
        );
    }

    #[test]
    fn test_split_amount_remainder_to_last() {
        let shares = split_amount_by_count(dec!(5.00), 3);
        assert_eq!(shares, vec![dec!(1.66), dec!(1.66), dec!(1.68)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(5.00));
    }

    #[test]
    fn test_split_points() {
        assert_eq!(split_points_by_count(10, 3), vec![4, 3, 3]);
        assert_eq!(split_points_by_count(9, 3), vec![3, 3, 3]);
        assert_eq!(split_points_by_count(0, 2), vec![0, 0]);
    }

    #[test]
    fn test_allocate_save5_example() {
        // cart [{A, £10.00×2, retailer R1}, {B, £5.00×1, retailer R2}],
        // code "SAVE5" (fixed £5, no minimum)
        let allocations = allocate(&[dec!(20.00), dec!(5.00)], dec!(5.00), 0);
        assert_eq!(allocations[0].discount, dec!(2.50));
        assert_eq!(allocations[0].total, dec!(17.50));
        assert_eq!(allocations[1].discount, dec!(2.50));
        assert_eq!(allocations[1].total, dec!(2.50));
    }

    #[test]
    fn test_allocate_floors_at_zero() {
        // £10 discount split £5/£5, but the first group only carries £2
        let allocations = allocate(&[dec!(2.00), dec!(10.00)], dec!(10.00), 0);
        assert_eq!(allocations[0].discount, dec!(2.00));
        assert_eq!(allocations[0].total, dec!(0.00));
        assert_eq!(allocations[1].discount, dec!(5.00));
        assert_eq!(allocations[1].total, dec!(5.00));
    }

    #[test]
    fn test_allocate_group_invariant() {
        // subtotal − discount − points value == total, and total ≥ 0
        let subtotals = [dec!(20.00), dec!(5.00), dec!(1.00)];
        let allocations = allocate(&subtotals, dec!(4.00), 300);
        for (subtotal, alloc) in subtotals.iter().zip(&allocations) {
            assert_eq!(
                subtotal - alloc.discount - points_value(alloc.points),
                alloc.total
            );
            assert!(alloc.total >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_allocate_points_clamped_by_remaining() {
        // one group worth £1.00 with a 300-point share: only 100 redeemable
        let allocations = allocate(&[dec!(1.00)], Decimal::ZERO, 300);
        assert_eq!(allocations[0].points, 100);
        assert_eq!(allocations[0].total, dec!(0.00));
    }
}
