//! Totals calculations for proforma quotations.
//!
//! The engine is pure: it takes priced line items and returns line and
//! quote totals grouped by currency.

pub mod common;
pub mod totals;

pub use totals::{
    CurrencyTotals, DEFAULT_TAX_RATE, LineItem, LineTotals, QuoteTotals, TaxRateLabel,
    TotalsEngine, TotalsError, compute_line_totals, compute_quote_totals,
};
