//! Common utility functions for invoice calculations.
//!
//! Rounding lives here so that the calculators themselves stay exact.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero). Only call this when a value is
/// rendered; sums must be built from the unrounded figures.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use invoice_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(33.254)), dec!(33.25));
/// assert_eq!(round_half_up(dec!(33.255)), dec!(33.26));
/// assert_eq!(round_half_up(dec!(-33.255)), dec!(-33.26)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount for display: rounded half-up, always two decimals,
/// prefixed with `symbol`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use invoice_core::calculations::common::format_money;
///
/// assert_eq!(format_money(dec!(208.25), "€"), "€208.25");
/// assert_eq!(format_money(dec!(110), "€"), "€110.00");
/// assert_eq!(format_money(dec!(-1.005), "$"), "-$1.01");
/// ```
pub fn format_money(
    value: Decimal,
    symbol: &str,
) -> String {
    let rounded = round_half_up(value);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{symbol}{:.2}", rounded.abs())
    } else {
        format!("{symbol}{:.2}", rounded.abs())
    }
}

/// Converts a form-style percentage (`19` for 19%) into the fractional rate
/// used by the calculators (`0.19`).
pub fn percent_to_rate(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED
}

/// Converts a fractional rate back to the percentage shown in forms.
pub fn rate_to_percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        let result = round_half_up(dec!(123.454));

        assert_eq!(result, dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        let result = round_half_up(dec!(123.455));

        assert_eq!(result, dec!(123.46));
    }

    #[test]
    fn round_half_up_handles_negative_values() {
        let result = round_half_up(dec!(-123.455));

        assert_eq!(result, dec!(-123.46));
    }

    #[test]
    fn round_half_up_handles_zero() {
        let result = round_half_up(dec!(0.00));

        assert_eq!(result, dec!(0.00));
    }

    // =========================================================================
    // format_money tests
    // =========================================================================

    #[test]
    fn format_money_pads_to_two_decimals() {
        assert_eq!(format_money(dec!(3.5), "€"), "€3.50");
    }

    #[test]
    fn format_money_rounds_at_presentation() {
        assert_eq!(format_money(dec!(0.125), "€"), "€0.13");
    }

    #[test]
    fn format_money_places_sign_before_symbol() {
        assert_eq!(format_money(dec!(-0.95), "€"), "-€0.95");
    }

    #[test]
    fn format_money_does_not_print_negative_zero() {
        assert_eq!(format_money(dec!(-0.001), "€"), "€0.00");
    }

    // =========================================================================
    // percent conversion tests
    // =========================================================================

    #[test]
    fn percent_to_rate_divides_by_hundred() {
        assert_eq!(percent_to_rate(dec!(19)), dec!(0.19));
        assert_eq!(percent_to_rate(dec!(7.5)), dec!(0.075));
    }

    #[test]
    fn rate_to_percent_multiplies_by_hundred() {
        assert_eq!(rate_to_percent(dec!(0.19)), dec!(19));
        assert_eq!(rate_to_percent(dec!(0)), dec!(0));
    }
}
