//! Line and quote totals for proforma quotations.
//!
//! # Line arithmetic
//!
//! | Step | Value | Rounded |
//! |------|-------|---------|
//! | 1    | `line_subtotal = quantity × unit_price` | no |
//! | 2    | `discount_amount = line_subtotal × discount% / 100` | yes |
//! | 3    | `net_subtotal = line_subtotal − discount_amount` | no |
//! | 4    | `line_tax = net_subtotal × tax% / 100` | yes |
//! | 5    | `line_total = net_subtotal + line_tax` | no |
//!
//! Tax is always computed on the post-discount base.
//!
//! # Quote aggregation
//!
//! Lines are grouped by currency and each group is totalled on its own;
//! there is never a cross-currency sum. Within a group, a shared tax rate
//! is applied once to the net subtotal, while heterogeneous rates fall back
//! to the sum of the already-rounded line taxes and are labelled "mixed".
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use proforma_core::calculations::{LineItem, TaxRateLabel, TotalsEngine};
//! use proforma_core::Currency;
//!
//! let items = vec![
//!     LineItem::new(1, dec!(1000), Currency::Crc),
//!     LineItem::new(2, dec!(500), Currency::Crc),
//! ];
//!
//! let totals = TotalsEngine::default().quote_totals(&items).unwrap();
//! let crc = totals.single().unwrap();
//!
//! assert_eq!(crc.subtotal, dec!(2000));
//! assert_eq!(crc.tax, dec!(260.00));
//! assert_eq!(crc.total, dec!(2260.00));
//! assert_eq!(crc.tax_rate, TaxRateLabel::Rate(dec!(13)));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::percent_of;
use crate::models::{Currency, QuoteCurrency};

/// Tax rate applied to lines that do not carry their own (IVA, 13%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(13, 0, 0, false, 0);

/// Errors that can occur while computing totals.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TotalsError {
    /// A line item field is outside its valid domain.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl TotalsError {
    fn invalid(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    fn out_of_range() -> Self {
        Self::invalid("unit_price", "amount out of range")
    }

    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidInput { field, .. } => field,
        }
    }
}

/// Priced input for one quote line. A snapshot: it does not follow later
/// catalog price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Percentage on a 0–100 scale.
    pub discount_percent: Decimal,
    /// Percentage on a 0–100 scale. `None` means the engine default.
    pub tax_rate: Option<Decimal>,
    pub currency: Currency,
}

impl LineItem {
    /// A line with no discount and the default tax rate.
    pub fn new(
        quantity: u32,
        unit_price: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            quantity,
            unit_price,
            discount_percent: Decimal::ZERO,
            tax_rate: None,
            currency,
        }
    }

    pub fn with_discount(
        mut self,
        discount_percent: Decimal,
    ) -> Self {
        self.discount_percent = discount_percent;
        self
    }

    pub fn with_tax_rate(
        mut self,
        tax_rate: Decimal,
    ) -> Self {
        self.tax_rate = Some(tax_rate);
        self
    }
}

/// Derived amounts for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub currency: Currency,
    /// Effective rate after the default was substituted.
    pub tax_rate: Decimal,
    pub line_subtotal: Decimal,
    pub discount_amount: Decimal,
    pub net_subtotal: Decimal,
    pub line_tax: Decimal,
    pub line_total: Decimal,
}

/// Tax rate shown next to a group's tax amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRateLabel {
    /// Every line in the group shares this rate.
    Rate(Decimal),
    /// The group mixes rates; its tax is the sum of the line taxes.
    Mixed,
}

impl TaxRateLabel {
    pub fn rate(&self) -> Option<Decimal> {
        match self {
            Self::Rate(rate) => Some(*rate),
            Self::Mixed => None,
        }
    }
}

impl std::fmt::Display for TaxRateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rate(rate) => write!(f, "{}%", rate.normalize()),
            Self::Mixed => f.write_str("mixed"),
        }
    }
}

/// Totals for the lines of a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub net_subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub tax_rate: TaxRateLabel,
}

impl CurrencyTotals {
    /// All-zero totals labelled with `tax_rate`.
    pub fn zero(tax_rate: Decimal) -> Self {
        Self {
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            net_subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            tax_rate: TaxRateLabel::Rate(tax_rate),
        }
    }
}

/// Quote-level totals.
///
/// A quote with zero or one currency is a flat `Single`; a quote that mixes
/// currencies is a map of independent per-currency buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteTotals {
    Single {
        /// `None` only for a quote with no lines.
        currency: Option<Currency>,
        totals: CurrencyTotals,
    },
    PerCurrency(BTreeMap<Currency, CurrencyTotals>),
}

impl QuoteTotals {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Single { currency: None, .. })
    }

    pub fn is_multi_currency(&self) -> bool {
        matches!(self, Self::PerCurrency(_))
    }

    /// Flat totals of a single-currency (or empty) quote.
    pub fn single(&self) -> Option<&CurrencyTotals> {
        match self {
            Self::Single { totals, .. } => Some(totals),
            Self::PerCurrency(_) => None,
        }
    }

    /// Totals for one currency bucket.
    pub fn get(
        &self,
        currency: Currency,
    ) -> Option<&CurrencyTotals> {
        match self {
            Self::Single {
                currency: Some(c),
                totals,
            } if *c == currency => Some(totals),
            Self::Single { .. } => None,
            Self::PerCurrency(groups) => groups.get(&currency),
        }
    }

    /// Every currency bucket, ordered by currency code.
    pub fn groups(&self) -> Vec<(Currency, &CurrencyTotals)> {
        match self {
            Self::Single {
                currency: Some(c),
                totals,
            } => vec![(*c, totals)],
            Self::Single { currency: None, .. } => Vec::new(),
            Self::PerCurrency(groups) => groups.iter().map(|(c, t)| (*c, t)).collect(),
        }
    }

    pub fn currencies(&self) -> Vec<Currency> {
        self.groups().into_iter().map(|(c, _)| c).collect()
    }

    /// Marker stored on the proforma header. Empty quotes report the
    /// default currency.
    pub fn quote_currency(&self) -> QuoteCurrency {
        match self {
            Self::Single { currency, .. } => QuoteCurrency::Single(currency.unwrap_or_default()),
            Self::PerCurrency(_) => QuoteCurrency::Mixed,
        }
    }
}

/// Calculator for line and quote totals.
///
/// Holds the tax rate substituted for lines without one. The engine is
/// stateless otherwise and can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsEngine {
    default_tax_rate: Decimal,
}

impl Default for TotalsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

impl TotalsEngine {
    pub fn new(default_tax_rate: Decimal) -> Self {
        Self { default_tax_rate }
    }

    pub fn default_tax_rate(&self) -> Decimal {
        self.default_tax_rate
    }

    /// Computes the totals for one line.
    ///
    /// # Errors
    ///
    /// Returns [`TotalsError::InvalidInput`] if the quantity is zero, the
    /// unit price is negative, the discount or effective tax rate falls
    /// outside 0–100, or an amount does not fit a [`Decimal`].
    pub fn line_totals(
        &self,
        item: &LineItem,
    ) -> Result<LineTotals, TotalsError> {
        let tax_rate = item.tax_rate.unwrap_or(self.default_tax_rate);
        validate(item, tax_rate)?;

        let line_subtotal = Decimal::from(item.quantity)
            .checked_mul(item.unit_price)
            .ok_or_else(TotalsError::out_of_range)?;
        let discount_amount = percent_of(line_subtotal, item.discount_percent)
            .ok_or_else(TotalsError::out_of_range)?;
        let net_subtotal = line_subtotal - discount_amount;
        let line_tax = percent_of(net_subtotal, tax_rate).ok_or_else(TotalsError::out_of_range)?;
        let line_total = net_subtotal
            .checked_add(line_tax)
            .ok_or_else(TotalsError::out_of_range)?;

        Ok(LineTotals {
            currency: item.currency,
            tax_rate,
            line_subtotal,
            discount_amount,
            net_subtotal,
            line_tax,
            line_total,
        })
    }

    /// Computes the quote totals for a list of lines.
    ///
    /// An empty list is valid and yields all-zero totals.
    ///
    /// # Errors
    ///
    /// Returns the first [`TotalsError`] raised by [`Self::line_totals`],
    /// or the one raised by [`Self::aggregate`].
    pub fn quote_totals(
        &self,
        items: &[LineItem],
    ) -> Result<QuoteTotals, TotalsError> {
        let lines = items
            .iter()
            .map(|item| self.line_totals(item))
            .collect::<Result<Vec<_>, _>>()?;

        self.aggregate(&lines)
    }

    /// Aggregates lines that were already priced by [`Self::line_totals`].
    ///
    /// # Errors
    ///
    /// Returns [`TotalsError::InvalidInput`] if a currency group's sums do
    /// not fit a [`Decimal`].
    pub fn aggregate(
        &self,
        lines: &[LineTotals],
    ) -> Result<QuoteTotals, TotalsError> {
        let mut groups: BTreeMap<Currency, Vec<&LineTotals>> = BTreeMap::new();
        for line in lines {
            groups.entry(line.currency).or_default().push(line);
        }

        debug!(
            lines = lines.len(),
            currencies = groups.len(),
            "aggregating quote totals"
        );

        let mut per_currency: BTreeMap<Currency, CurrencyTotals> = groups
            .into_iter()
            .map(|(currency, group)| Ok((currency, group_totals(&group)?)))
            .collect::<Result<_, TotalsError>>()?;

        if per_currency.len() > 1 {
            return Ok(QuoteTotals::PerCurrency(per_currency));
        }

        Ok(match per_currency.pop_first() {
            Some((currency, totals)) => QuoteTotals::Single {
                currency: Some(currency),
                totals,
            },
            None => QuoteTotals::Single {
                currency: None,
                totals: CurrencyTotals::zero(self.default_tax_rate),
            },
        })
    }
}

fn checked_sum(
    lines: &[&LineTotals],
    value: impl Fn(&LineTotals) -> Decimal,
) -> Result<Decimal, TotalsError> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(value(line)).ok_or_else(TotalsError::out_of_range)
    })
}

/// Totals one currency group. `lines` is never empty.
fn group_totals(lines: &[&LineTotals]) -> Result<CurrencyTotals, TotalsError> {
    let subtotal = checked_sum(lines, |l| l.line_subtotal)?;
    let discount = checked_sum(lines, |l| l.discount_amount)?;
    let net_subtotal = subtotal - discount;

    let first_rate = lines.first().map(|l| l.tax_rate).unwrap_or(DEFAULT_TAX_RATE);
    let shared_rate = lines.iter().all(|l| l.tax_rate == first_rate);

    // Mixed rates add up the already rounded line taxes.
    let (tax, tax_rate) = if shared_rate {
        let tax = percent_of(net_subtotal, first_rate).ok_or_else(TotalsError::out_of_range)?;
        (tax, TaxRateLabel::Rate(first_rate))
    } else {
        (checked_sum(lines, |l| l.line_tax)?, TaxRateLabel::Mixed)
    };

    Ok(CurrencyTotals {
        subtotal,
        discount,
        net_subtotal,
        tax,
        total: net_subtotal
            .checked_add(tax)
            .ok_or_else(TotalsError::out_of_range)?,
        tax_rate,
    })
}

fn validate(
    item: &LineItem,
    tax_rate: Decimal,
) -> Result<(), TotalsError> {
    if item.quantity == 0 {
        return Err(TotalsError::invalid("quantity", "must be at least 1"));
    }
    if item.unit_price < Decimal::ZERO {
        return Err(TotalsError::invalid(
            "unit_price",
            format!("{} is negative", item.unit_price),
        ));
    }
    check_percent("discount_percent", item.discount_percent)?;
    check_percent("tax_rate", tax_rate)
}

fn check_percent(
    field: &'static str,
    value: Decimal,
) -> Result<(), TotalsError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(TotalsError::invalid(
            field,
            format!("{value} is outside 0-100"),
        ));
    }
    Ok(())
}

/// Computes one line's totals with the default engine.
pub fn compute_line_totals(item: &LineItem) -> Result<LineTotals, TotalsError> {
    TotalsEngine::default().line_totals(item)
}

/// Computes quote totals with the default engine.
pub fn compute_quote_totals(items: &[LineItem]) -> Result<QuoteTotals, TotalsError> {
    TotalsEngine::default().quote_totals(items)
}
