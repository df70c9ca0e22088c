//! Common utility functions for quote calculations.
//!
//! This module provides the rounding and percentage helpers shared by the
//! line and quote totals.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use proforma_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Applies a percentage (0–100 scale) to an amount and rounds the result
/// to two decimal places.
///
/// The rate is scaled down before multiplying, so a percentage of at most
/// 100 never grows the amount. Returns `None` if the product overflows.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use proforma_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of(dec!(1000), dec!(13)), Some(dec!(130.00)));
/// assert_eq!(percent_of(dec!(999.99), dec!(13)), Some(dec!(130.00)));
/// ```
pub fn percent_of(
    amount: Decimal,
    percent: Decimal,
) -> Option<Decimal> {
    let fraction = percent.checked_div(Decimal::ONE_HUNDRED)?;
    amount.checked_mul(fraction).map(round_half_up)
}
