//! CSV loader for quote line items.
//!
//! Headers are matched by name, so column order does not matter.
//!
//! | Column             | Required | Notes                                   |
//! |--------------------|----------|-----------------------------------------|
//! | `brand`            | yes      |                                         |
//! | `model`            | yes      |                                         |
//! | `quantity`         | yes      | whole units, at least 1                 |
//! | `unit_price`       | yes      | decimal                                 |
//! | `currency`         | yes      | `CRC` or `USD`                          |
//! | `year`             | no       |                                         |
//! | `description`      | no       |                                         |
//! | `discount_percent` | no       | empty means 0                           |
//! | `tax_rate`         | no       | empty means the configured default rate |
//! | `model_id`         | no       | catalog reference                       |
//! | `image_path`       | no       |                                         |
//!
//! ```csv
//! brand,model,quantity,unit_price,currency,discount_percent
//! John Deere,5075E,1,32000.00,USD,5
//! Kuhn,BP-30,2,4500.00,USD,
//! ```
use std::path::Path;

use proforma_core::{Currency, NewProformaItem};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CsvRow {
    brand: String,
    model: String,
    quantity: u32,
    unit_price: Decimal,
    currency: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    discount_percent: Option<Decimal>,
    #[serde(default)]
    tax_rate: Option<Decimal>,
    #[serde(default)]
    model_id: Option<i64>,
    #[serde(default)]
    image_path: Option<String>,
}

/// Errors that can occur while reading a line-item file.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// `row` is 1-based, not counting the header.
    #[error("unrecognised currency '{currency}' on row {row}")]
    InvalidCurrency { currency: String, row: usize },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<NewProformaItem, CsvLoadError> {
    let currency = Currency::parse(&row.currency).ok_or_else(|| CsvLoadError::InvalidCurrency {
        currency: row.currency.clone(),
        row: row_number,
    })?;

    Ok(NewProformaItem {
        model_id: row.model_id,
        brand_name: row.brand,
        model_name: row.model,
        year: row.year,
        description: row.description.unwrap_or_default(),
        image_path: row.image_path.unwrap_or_default(),
        quantity: row.quantity,
        unit_price: row.unit_price,
        discount_percent: row.discount_percent.unwrap_or(Decimal::ZERO),
        tax_rate: row.tax_rate,
        currency,
    })
}

/// Parses line items from CSV text, in file order.
pub fn load_from_str(input: &str) -> Result<Vec<NewProformaItem>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| convert_row(result?, idx + 1))
        .collect()
}

pub fn load_from_file(path: &Path) -> Result<Vec<NewProformaItem>, CsvLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_from_str(&contents)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const MINIMAL_CSV: &str = "\
brand,model,quantity,unit_price,currency
John Deere,5075E,1,32000.00,USD
";

    #[test]
    fn test_minimal_row_uses_defaults() {
        let items = load_from_str(MINIMAL_CSV).unwrap();

        assert_eq!(
            items,
            vec![NewProformaItem::new("John Deere", "5075E", 1, dec!(32000.00), Currency::Usd)]
        );
    }

    #[test]
    fn test_optional_columns_in_any_order() {
        let csv = "\
tax_rate,currency,model,brand,unit_price,quantity,discount_percent,year,model_id
1,crc,BP-30,Kuhn,4500,2,10,2024,7
";

        let items = load_from_str(csv).unwrap();
        let item = &items[0];

        assert_eq!(item.currency, Currency::Crc);
        assert_eq!(item.tax_rate, Some(dec!(1)));
        assert_eq!(item.discount_percent, dec!(10));
        assert_eq!(item.year, Some(2024));
        assert_eq!(item.model_id, Some(7));
    }

    #[test]
    fn test_empty_optional_cells() {
        let csv = "\
brand,model,quantity,unit_price,currency,discount_percent,tax_rate,description
Kuhn,BP-30,1,4500,USD,,,
";

        let item = &load_from_str(csv).unwrap()[0];

        assert_eq!(item.discount_percent, Decimal::ZERO);
        assert_eq!(item.tax_rate, None);
        assert_eq!(item.description, "");
    }

    #[test]
    fn test_invalid_currency_reports_row() {
        let csv = "\
brand,model,quantity,unit_price,currency
Kuhn,BP-30,1,4500,USD
Kuhn,BP-40,1,4500,EUR
";

        let err = load_from_str(csv).unwrap_err();

        assert!(matches!(
            err,
            CsvLoadError::InvalidCurrency { ref currency, row: 2 } if currency == "EUR"
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "brand,model,quantity,currency\nKuhn,BP-30,1,USD\n";

        assert!(matches!(load_from_str(csv), Err(CsvLoadError::Parse(_))));
    }

    #[test]
    fn test_negative_quantity_is_a_parse_error() {
        let csv = "brand,model,quantity,unit_price,currency\nKuhn,BP-30,-1,4500,USD\n";

        assert!(matches!(load_from_str(csv), Err(CsvLoadError::Parse(_))));
    }
}
