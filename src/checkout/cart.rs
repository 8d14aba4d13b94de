//! Cart materialization
//!
//! Turns the buyer's cart snapshot (prices and stock frozen at read time)
//! into per-retailer groups. Any shortage aborts the whole checkout, with
//! no silent truncation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::db::cart::CartLineSnapshot;
use crate::error::{AppError, ErrorCode};
use crate::money::round_money;

/// One retailer's slice of the cart, priced at snapshot time
#[derive(Debug, Clone)]
pub struct RetailerCart {
    pub retailer_id: i64,
    pub lines: Vec<CartLineSnapshot>,
    pub subtotal: Decimal,
}

/// Group cart lines by retailer, validating stock and product state.
///
/// Grouping is keyed on retailer id in ascending order, so group ordering is
/// deterministic for a given cart.
pub fn materialize(lines: Vec<CartLineSnapshot>) -> Result<Vec<RetailerCart>, AppError> {
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let mut grouped: BTreeMap<i64, Vec<CartLineSnapshot>> = BTreeMap::new();
    for line in lines {
        if !line.is_active {
            return Err(AppError::new(ErrorCode::ProductInactive)
                .with_detail("product_id", line.product_id));
        }
        if line.quantity > line.available {
            return Err(AppError::out_of_stock(
                line.product_id,
                line.available,
                line.quantity,
            ));
        }
        grouped.entry(line.retailer_id).or_default().push(line);
    }

    Ok(grouped
        .into_iter()
        .map(|(retailer_id, lines)| {
            let subtotal = lines
                .iter()
                .map(|l| round_money(l.unit_price * Decimal::from(l.quantity)))
                .sum();
            RetailerCart {
                retailer_id,
                lines,
                subtotal,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(
        product_id: i64,
        retailer_id: i64,
        price: Decimal,
        quantity: i32,
        available: i32,
    ) -> CartLineSnapshot {
        CartLineSnapshot {
            product_id,
            retailer_id,
            product_name: format!("product-{product_id}"),
            unit_price: price,
            is_active: true,
            available,
            quantity,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = materialize(vec![]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[test]
    fn test_groups_by_retailer_with_subtotals() {
        let carts = materialize(vec![
            line(1, 10, dec!(10.00), 2, 5),
            line(2, 20, dec!(5.00), 1, 5),
            line(3, 10, dec!(1.50), 3, 5),
        ])
        .unwrap();

        assert_eq!(carts.len(), 2);
        assert_eq!(carts[0].retailer_id, 10);
        assert_eq!(carts[0].subtotal, dec!(24.50)); // 20.00 + 4.50
        assert_eq!(carts[0].lines.len(), 2);
        assert_eq!(carts[1].retailer_id, 20);
        assert_eq!(carts[1].subtotal, dec!(5.00));
    }

    #[test]
    fn test_shortage_aborts_whole_checkout() {
        let err = materialize(vec![
            line(1, 10, dec!(10.00), 2, 5),
            line(2, 20, dec!(5.00), 6, 5),
        ])
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        let details = err.details.unwrap();
        assert_eq!(details.get("product_id").unwrap(), 2);
        assert_eq!(details.get("available").unwrap(), 5);
        assert_eq!(details.get("requested").unwrap(), 6);
    }

    #[test]
    fn test_inactive_product_aborts() {
        let mut inactive = line(1, 10, dec!(10.00), 1, 5);
        inactive.is_active = false;
        let err = materialize(vec![inactive]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInactive);
    }
}
