use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::percent_to_rate;

/// The numeric inputs of one invoice row.
///
/// Rates (`percent_discount`, `tax_rate`) are fractions in `[0, 1]`, so `0.19`
/// means 19%. Monetary values are major currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub percent_discount: Decimal,
    pub fixed_discount: Decimal,
    pub tax_rate: Decimal,
}

/// Range violations reported by [`LineItem::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineItemError {
    #[error("quantity must not be negative, got {0}")]
    NegativeQuantity(Decimal),

    #[error("unit price must not be negative, got {0}")]
    NegativeUnitPrice(Decimal),

    #[error("percent discount must be between 0 and 1, got {0}")]
    PercentDiscountOutOfRange(Decimal),

    #[error("fixed discount must not be negative, got {0}")]
    NegativeFixedDiscount(Decimal),

    #[error("tax rate must be between 0 and 1, got {0}")]
    TaxRateOutOfRange(Decimal),
}

impl LineItem {
    /// A line with no discounts.
    pub fn new(
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            quantity,
            unit_price,
            tax_rate,
            ..Self::default()
        }
    }

    /// Builds a line from form-style percentages (`19` for 19%).
    pub fn from_percentages(
        quantity: Decimal,
        unit_price: Decimal,
        discount_percent: Decimal,
        fixed_discount: Decimal,
        tax_percent: Decimal,
    ) -> Self {
        Self {
            quantity,
            unit_price,
            percent_discount: percent_to_rate(discount_percent),
            fixed_discount,
            tax_rate: percent_to_rate(tax_percent),
        }
    }

    /// Quantity times unit price, before any discount.
    pub fn list_amount(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// Monetary value of the percentage discount.
    pub fn percent_discount_amount(&self) -> Decimal {
        self.list_amount() * self.percent_discount
    }

    /// Checks that every field is inside its allowed range.
    ///
    /// The calculators never call this; it is meant for the boundary where
    /// user input becomes a `LineItem`.
    ///
    /// # Errors
    ///
    /// Returns the first [`LineItemError`] found, checking fields in
    /// declaration order.
    pub fn validate(&self) -> Result<(), LineItemError> {
        if self.quantity < Decimal::ZERO {
            return Err(LineItemError::NegativeQuantity(self.quantity));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(LineItemError::NegativeUnitPrice(self.unit_price));
        }
        if self.percent_discount < Decimal::ZERO || self.percent_discount > Decimal::ONE {
            return Err(LineItemError::PercentDiscountOutOfRange(
                self.percent_discount,
            ));
        }
        if self.fixed_discount < Decimal::ZERO {
            return Err(LineItemError::NegativeFixedDiscount(self.fixed_discount));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(LineItemError::TaxRateOutOfRange(self.tax_rate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn valid_item() -> LineItem {
        LineItem {
            quantity: dec!(2),
            unit_price: dec!(100),
            percent_discount: dec!(0.1),
            fixed_discount: dec!(5),
            tax_rate: dec!(0.19),
        }
    }

    #[test]
    fn validate_accepts_valid_item() {
        assert_eq!(valid_item().validate(), Ok(()));
    }

    #[test]
    fn validate_accepts_boundary_rates() {
        let item = LineItem {
            percent_discount: dec!(1),
            tax_rate: dec!(0),
            ..valid_item()
        };

        assert_eq!(item.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_negative_quantity() {
        let item = LineItem {
            quantity: dec!(-1),
            ..valid_item()
        };

        assert_eq!(item.validate(), Err(LineItemError::NegativeQuantity(dec!(-1))));
    }

    #[test]
    fn validate_rejects_negative_unit_price() {
        let item = LineItem {
            unit_price: dec!(-0.01),
            ..valid_item()
        };

        assert_eq!(
            item.validate(),
            Err(LineItemError::NegativeUnitPrice(dec!(-0.01)))
        );
    }

    #[test]
    fn validate_rejects_percent_discount_given_as_percentage() {
        let item = LineItem {
            percent_discount: dec!(10),
            ..valid_item()
        };

        assert_eq!(
            item.validate(),
            Err(LineItemError::PercentDiscountOutOfRange(dec!(10)))
        );
    }

    #[test]
    fn validate_rejects_negative_fixed_discount() {
        let item = LineItem {
            fixed_discount: dec!(-5),
            ..valid_item()
        };

        assert_eq!(
            item.validate(),
            Err(LineItemError::NegativeFixedDiscount(dec!(-5)))
        );
    }

    #[test]
    fn validate_rejects_tax_rate_above_one() {
        let item = LineItem {
            tax_rate: dec!(1.19),
            ..valid_item()
        };

        assert_eq!(
            item.validate(),
            Err(LineItemError::TaxRateOutOfRange(dec!(1.19)))
        );
    }

    #[test]
    fn validate_reports_first_violation() {
        let item = LineItem {
            quantity: dec!(-1),
            tax_rate: dec!(2),
            ..valid_item()
        };

        assert_eq!(item.validate(), Err(LineItemError::NegativeQuantity(dec!(-1))));
    }

    #[test]
    fn from_percentages_converts_rates() {
        let item = LineItem::from_percentages(dec!(2), dec!(100), dec!(10), dec!(5), dec!(19));

        assert_eq!(item, valid_item());
    }

    #[test]
    fn percent_discount_amount_uses_list_amount() {
        assert_eq!(valid_item().list_amount(), dec!(200));
        assert_eq!(valid_item().percent_discount_amount(), dec!(20));
    }
}
