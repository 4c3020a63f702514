//! Per-line price derivation.
//!
//! | Value         | Formula                                              |
//! |---------------|------------------------------------------------------|
//! | `net_price`   | `quantity × unit_price × (1 − percent_discount)`     |
//! | `tax_amount`  | `(net_price − fixed_discount) × tax_rate`            |
//! | `gross_price` | `net_price − fixed_discount + tax_amount`            |
//!
//! The percentage discount is applied first, the fixed discount second, and
//! tax is charged on what remains. Changing that order changes invoice totals.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use invoice_core::{LineItem, compute_line};
//!
//! let item = LineItem {
//!     quantity: dec!(2),
//!     unit_price: dec!(100),
//!     percent_discount: dec!(0.1),
//!     fixed_discount: dec!(5),
//!     tax_rate: dec!(0.19),
//! };
//!
//! let amounts = compute_line(&item);
//!
//! assert_eq!(amounts.net_price, dec!(180));
//! assert_eq!(amounts.tax_amount, dec!(33.25));
//! assert_eq!(amounts.gross_price, dec!(208.25));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::LineItem;

/// Amounts derived from a single [`LineItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineAmounts {
    /// Amount after quantity and percentage discount, before the fixed
    /// discount and tax.
    pub net_price: Decimal,

    /// Tax charged on `net_price - fixed_discount`.
    pub tax_amount: Decimal,

    /// Customer-payable amount for the line.
    pub gross_price: Decimal,
}

/// Computes net, tax and gross amounts for one line.
///
/// Inputs are not range-checked and nothing is rounded. Out-of-range inputs
/// give deterministic results (a fixed discount larger than the net price
/// yields a negative gross price, for instance); validate with
/// [`LineItem::validate`] before calling if that matters.
pub fn compute_line(item: &LineItem) -> LineAmounts {
    let net_price = item.list_amount() * (Decimal::ONE - item.percent_discount);
    let taxable = net_price - item.fixed_discount;
    let tax_amount = taxable * item.tax_rate;
    let gross_price = taxable + tax_amount;

    if gross_price < Decimal::ZERO {
        warn!(
            net_price = %net_price,
            fixed_discount = %item.fixed_discount,
            gross_price = %gross_price,
            "line gross price is negative"
        );
    }

    LineAmounts {
        net_price,
        tax_amount,
        gross_price,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::*;

    fn item(
        quantity: Decimal,
        unit_price: Decimal,
        percent_discount: Decimal,
        fixed_discount: Decimal,
        tax_rate: Decimal,
    ) -> LineItem {
        LineItem {
            quantity,
            unit_price,
            percent_discount,
            fixed_discount,
            tax_rate,
        }
    }

    /// Initializes tracing subscriber for tests that verify log output.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_span_events(FmtSpan::NONE)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[test]
    fn applies_percent_then_fixed_discount_then_tax() {
        let result = compute_line(&item(dec!(2), dec!(100), dec!(0.1), dec!(5), dec!(0.19)));

        assert_eq!(
            result,
            LineAmounts {
                net_price: dec!(180),
                tax_amount: dec!(33.25),
                gross_price: dec!(208.25),
            }
        );
    }

    #[test]
    fn taxed_line_without_discounts() {
        let result = compute_line(&item(dec!(1), dec!(50), dec!(0), dec!(0), dec!(0.07)));

        assert_eq!(result.net_price, dec!(50));
        assert_eq!(result.tax_amount, dec!(3.5));
        assert_eq!(result.gross_price, dec!(53.5));
    }

    #[test]
    fn untaxed_line_without_discounts() {
        let result = compute_line(&item(dec!(3), dec!(20), dec!(0), dec!(0), dec!(0)));

        assert_eq!(result.net_price, dec!(60));
        assert_eq!(result.tax_amount, dec!(0));
        assert_eq!(result.gross_price, dec!(60));
    }

    #[test]
    fn no_discounts_gross_is_net_times_one_plus_rate() {
        let line = item(dec!(7), dec!(12.34), dec!(0), dec!(0), dec!(0.19));

        let result = compute_line(&line);

        assert_eq!(result.net_price, dec!(7) * dec!(12.34));
        assert_eq!(result.tax_amount, result.net_price * dec!(0.19));
        assert_eq!(result.gross_price, result.net_price * dec!(1.19));
    }

    #[test]
    fn zero_quantity_leaves_only_fixed_discount() {
        let result = compute_line(&item(dec!(0), dec!(100), dec!(0.1), dec!(5), dec!(0.19)));

        assert_eq!(result.net_price, dec!(0));
        assert_eq!(result.tax_amount, dec!(-5) * dec!(0.19));
        assert_eq!(result.gross_price, dec!(-5) + result.tax_amount);
    }

    #[test]
    fn zero_unit_price_leaves_only_fixed_discount() {
        let _guard = init_test_tracing();

        let result = compute_line(&item(dec!(4), dec!(0), dec!(0), dec!(2.5), dec!(0.2)));

        assert_eq!(result.net_price, dec!(0));
        assert_eq!(result.tax_amount, dec!(-0.5));
        assert_eq!(result.gross_price, dec!(-3.0));
    }

    #[test]
    fn full_percent_discount_zeroes_net_price() {
        let result = compute_line(&item(dec!(3), dec!(9.99), dec!(1), dec!(0), dec!(0.19)));

        assert_eq!(result.net_price, dec!(0));
        assert_eq!(result.gross_price, dec!(0));
    }

    #[test]
    fn does_not_round_intermediate_values() {
        let result = compute_line(&item(dec!(1), dec!(0.333), dec!(0), dec!(0), dec!(0.19)));

        assert_eq!(result.tax_amount, dec!(0.06327));
        assert_eq!(result.gross_price, dec!(0.39627));
    }

    #[test]
    fn out_of_range_inputs_are_not_rejected() {
        let _guard = init_test_tracing();

        let result = compute_line(&item(dec!(-2), dec!(10), dec!(0), dec!(0), dec!(0.5)));

        assert_eq!(result.net_price, dec!(-20));
        assert_eq!(result.tax_amount, dec!(-10));
        assert_eq!(result.gross_price, dec!(-30));
    }

    #[test]
    fn gross_price_identity_holds() {
        let line = item(dec!(3.5), dec!(17.99), dec!(0.15), dec!(4.2), dec!(0.07));

        let result = compute_line(&line);

        assert_eq!(
            result.gross_price,
            result.net_price - line.fixed_discount + result.tax_amount
        );
    }

    #[test]
    fn is_idempotent() {
        let line = item(dec!(2), dec!(100), dec!(0.1), dec!(5), dec!(0.19));

        assert_eq!(compute_line(&line), compute_line(&line));
    }
}
