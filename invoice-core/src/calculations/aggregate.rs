//! Invoice-level totals.
//!
//! | Total            | Formula                                                     |
//! |------------------|-------------------------------------------------------------|
//! | `subtotal`       | Σ (`net_price` − `fixed_discount`)                          |
//! | `tax_total`      | Σ `tax_amount`                                              |
//! | `total_discount` | Σ (`fixed_discount` + `quantity × unit_price × percent_discount`) |
//! | `total`          | `subtotal` + `tax_total`                                    |
//!
//! Sums are folded left to right in input order over unrounded line amounts.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use invoice_core::{LineItem, aggregate};
//!
//! let items = [
//!     LineItem::new(dec!(1), dec!(50), dec!(0.07)),
//!     LineItem::new(dec!(3), dec!(20), dec!(0)),
//! ];
//!
//! let totals = aggregate(&items);
//!
//! assert_eq!(totals.subtotal, dec!(110));
//! assert_eq!(totals.tax_total, dec!(3.5));
//! assert_eq!(totals.total_discount, dec!(0));
//! assert_eq!(totals.total, dec!(113.5));
//! ```

use std::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LineItem;
use crate::calculations::common::round_half_up;
use crate::calculations::line::compute_line;

/// Totals for a whole invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Discounted amount before tax.
    pub subtotal: Decimal,

    /// Sum of line taxes.
    pub tax_total: Decimal,

    /// Fixed discounts plus the monetary value of percentage discounts.
    pub total_discount: Decimal,

    /// `subtotal + tax_total`.
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Totals of an invoice with no lines.
    pub const ZERO: Self = Self {
        subtotal: Decimal::ZERO,
        tax_total: Decimal::ZERO,
        total_discount: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    /// Contribution of one line to the invoice totals.
    fn of_line(item: &LineItem) -> Self {
        let amounts = compute_line(item);
        let subtotal = amounts.net_price - item.fixed_discount;
        Self {
            subtotal,
            tax_total: amounts.tax_amount,
            total_discount: item.fixed_discount + item.percent_discount_amount(),
            total: subtotal + amounts.tax_amount,
        }
    }

    /// Copy of the totals rounded half-up to two decimal places, for display.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_half_up(self.subtotal),
            tax_total: round_half_up(self.tax_total),
            total_discount: round_half_up(self.total_discount),
            total: round_half_up(self.total),
        }
    }
}

impl Add for InvoiceTotals {
    type Output = Self;

    fn add(
        self,
        rhs: Self,
    ) -> Self {
        let subtotal = self.subtotal + rhs.subtotal;
        let tax_total = self.tax_total + rhs.tax_total;
        Self {
            subtotal,
            tax_total,
            total_discount: self.total_discount + rhs.total_discount,
            total: subtotal + tax_total,
        }
    }
}

/// Rolls line items up into invoice totals.
///
/// An empty slice yields [`InvoiceTotals::ZERO`]. Like [`compute_line`], this
/// never fails and never rounds.
pub fn aggregate(items: &[LineItem]) -> InvoiceTotals {
    let totals = items
        .iter()
        .fold(InvoiceTotals::ZERO, |acc, item| acc + InvoiceTotals::of_line(item));

    debug!(
        lines = items.len(),
        subtotal = %totals.subtotal,
        tax_total = %totals.tax_total,
        total = %totals.total,
        "aggregated invoice lines"
    );

    totals
}
