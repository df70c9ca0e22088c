//! Loader and `totals` command against the on-disk fixture file.

use std::path::Path;

use pretty_assertions::assert_eq;
use proforma_cli::app;
use proforma_cli::cli::TotalsArgs;
use proforma_cli::csv_loader;
use proforma_core::{Currency, QuoteConfig};
use rust_decimal_macros::dec;

fn fixture_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("sample_items.csv")
        .leak()
}

#[test]
fn test_load_fixture_file_succeeds() {
    let items = csv_loader::load_from_file(fixture_path()).expect("fixture file should load");

    assert_eq!(items.len(), 3);
}

#[test]
fn test_fixture_rows_keep_file_order_and_types() {
    let items = csv_loader::load_from_file(fixture_path()).unwrap();

    let tractor = &items[0];
    assert_eq!(tractor.brand_name, "John Deere");
    assert_eq!(tractor.year, Some(2025));
    assert_eq!(tractor.discount_percent, dec!(5));
    assert_eq!(tractor.tax_rate, None);

    let pump = &items[1];
    assert_eq!(pump.quantity, 2);
    assert_eq!(pump.year, None);
    assert_eq!(pump.tax_rate, Some(dec!(1)));

    assert_eq!(items[2].currency, Currency::Crc);
    assert_eq!(items[2].tax_rate, Some(dec!(0)));
}

#[test]
fn test_missing_file_reports_path() {
    let err = csv_loader::load_from_file(Path::new("/nonexistent/items.csv")).unwrap_err();

    assert!(err.to_string().contains("/nonexistent/items.csv"));
}

#[test]
fn test_totals_report_groups_by_currency() {
    let args = TotalsArgs {
        items: fixture_path().to_path_buf(),
        default_tax_rate: None,
    };
    let mut out = Vec::new();

    app::run_totals(&args, &QuoteConfig::default(), &mut out).unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(report["lines"].as_array().unwrap().len(), 3);
    assert!(report["totals"]["per_currency"]["USD"].is_object());
    assert!(report["totals"]["per_currency"]["CRC"].is_object());
}
