//! Money arithmetic using rust_decimal for precision
//!
//! All monetary values flow through the service as `Decimal` (NUMERIC in
//! Postgres), rounded to 2 decimal places half-up at every boundary that
//! produces a derived amount. Points are plain integers worth one penny each.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::{AppError, ErrorCode};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Redemption value of a single reward point
pub const POINT_VALUE: Decimal = dec!(0.01);

/// Cashback accrual rate on order creation (1% of combined totals)
pub const CASHBACK_RATE: Decimal = dec!(0.01);

/// Round a derived amount to money precision
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Monetary value of a points quantity
#[inline]
pub fn points_value(points: i64) -> Decimal {
    Decimal::from(points) * POINT_VALUE
}

/// Largest whole-point quantity whose value does not exceed `amount`
#[inline]
pub fn max_points_within(amount: Decimal) -> i64 {
    (amount / POINT_VALUE).floor().to_i64().unwrap_or(0).max(0)
}

/// Cashback points earned on a given total, floored to whole points
#[inline]
pub fn cashback_points(total: Decimal) -> i64 {
    ((total * CASHBACK_RATE) / POINT_VALUE)
        .floor()
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

/// Currencies a payout may be requested in. GBP is the base currency all
/// balances are normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gbp,
    Usd,
    Eur,
}

impl Currency {
    /// Parse from database/API string value (ISO 4217 uppercase)
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "GBP" => Some(Self::Gbp),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// Fixed conversion rate into the base currency (GBP per unit)
    pub fn rate_to_base(&self) -> Decimal {
        match self {
            Self::Gbp => dec!(1.00),
            Self::Usd => dec!(0.79),
            Self::Eur => dec!(0.86),
        }
    }
}

/// Parse and validate a requested payout currency
pub fn parse_currency(code: &str) -> Result<Currency, AppError> {
    Currency::from_code(code).ok_or_else(|| {
        AppError::new(ErrorCode::CurrencyUnsupported).with_detail("currency", code.to_string())
    })
}

/// Convert an amount in `currency` to the base currency, money-rounded
pub fn to_base(amount: Decimal, currency: Currency) -> Decimal {
    round_money(amount * currency.rate_to_base())
}

/// Convert a money-rounded amount into the processor's integer minor units
pub fn to_minor_units(amount: Decimal) -> i64 {
    (round_money(amount) * dec!(100)).to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn test_points_value() {
        assert_eq!(points_value(0), dec!(0.00));
        assert_eq!(points_value(250), dec!(2.50));
        assert_eq!(points_value(1), dec!(0.01));
    }

    #[test]
    fn test_max_points_within() {
        assert_eq!(max_points_within(dec!(2.50)), 250);
        assert_eq!(max_points_within(dec!(0.009)), 0);
        assert_eq!(max_points_within(dec!(-1.00)), 0);
    }

    #[test]
    fn test_cashback_points_floors() {
        // 1% of £17.50 is £0.175 → 17.5 points → 17
        assert_eq!(cashback_points(dec!(17.50)), 17);
        assert_eq!(cashback_points(dec!(100.00)), 100);
        assert_eq!(cashback_points(dec!(0.99)), 0);
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("GBP"), Some(Currency::Gbp));
        assert_eq!(Currency::from_code("USD"), Some(Currency::Usd));
        assert_eq!(Currency::from_code("JPY"), None);
        assert_eq!(Currency::Eur.as_code(), "EUR");
    }

    #[test]
    fn test_to_base_conversion() {
        assert_eq!(to_base(dec!(100.00), Currency::Gbp), dec!(100.00));
        assert_eq!(to_base(dec!(100.00), Currency::Usd), dec!(79.00));
        assert_eq!(to_base(dec!(33.33), Currency::Eur), dec!(28.66)); // 28.6638 rounds down
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(dec!(17.50)), 1750);
        assert_eq!(to_minor_units(dec!(0.01)), 1);
        assert_eq!(to_minor_units(dec!(100)), 10000);
    }

    #[test]
    fn test_parse_currency_rejects_unknown() {
        let err = parse_currency("XRP").unwrap_err();
        assert_eq!(err.code, ErrorCode::CurrencyUnsupported);
    }
}
