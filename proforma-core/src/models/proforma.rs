use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Currency, EquipmentType, QuoteCurrency};
use crate::calculations::{LineItem, LineTotals};

/// Default number of days a quote stays valid.
pub const DEFAULT_VALIDITY_DAYS: u32 = 15;

/// A stored quotation with its ordered line items.
///
/// `subtotal` through `total` cache the engine output for single-currency
/// quotes. When `currency` is [`QuoteCurrency::Mixed`] they are zero and the
/// per-currency breakdown must be recomputed from `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proforma {
    pub id: i64,
    pub number: String,
    pub customer_id: i64,
    pub advisor_id: Option<i64>,
    pub customer_attention: String,
    pub template: EquipmentType,
    pub validity_days: u32,
    pub date: NaiveDate,
    pub currency: QuoteCurrency,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub net_subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub custom_terms: String,
    pub custom_fiscal_note: String,
    pub notes: String,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<ProformaItem>,
}

impl Proforma {
    /// Engine inputs rebuilt from the stored item snapshots.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(ProformaItem::line_item).collect()
    }

    /// Last day the quote is valid.
    pub fn valid_until(&self) -> NaiveDate {
        self.date
            .checked_add_days(Days::new(u64::from(self.validity_days)))
            .unwrap_or(self.date)
    }
}

/// A frozen copy of a catalog model on a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaItem {
    pub id: i64,
    pub proforma_id: i64,
    /// Catalog source, if any. Cleared when the model is deleted.
    pub model_id: Option<i64>,
    pub brand_name: String,
    pub model_name: String,
    pub year: Option<i32>,
    pub description: String,
    pub image_path: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub line_subtotal: Decimal,
    pub tax_rate: Decimal,
    pub line_tax: Decimal,
    pub line_total: Decimal,
    pub currency: Currency,
}

impl ProformaItem {
    pub fn line_item(&self) -> LineItem {
        LineItem {
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_rate: Some(self.tax_rate),
            currency: self.currency,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.brand_name, self.model_name)
            .trim()
            .to_string()
    }

    /// Copy of this line for a new quote, keeping its custom tax rate.
    pub fn to_new_item(&self) -> NewProformaItem {
        NewProformaItem {
            model_id: self.model_id,
            brand_name: self.brand_name.clone(),
            model_name: self.model_name.clone(),
            year: self.year,
            description: self.description.clone(),
            image_path: self.image_path.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_rate: Some(self.tax_rate),
            currency: self.currency,
        }
    }
}

/// A line item as entered, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProformaItem {
    pub model_id: Option<i64>,
    pub brand_name: String,
    pub model_name: String,
    pub year: Option<i32>,
    pub description: String,
    pub image_path: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    /// `None` means the configured default rate.
    pub tax_rate: Option<Decimal>,
    pub currency: Currency,
}

impl NewProformaItem {
    pub fn new(
        brand_name: impl Into<String>,
        model_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            model_id: None,
            brand_name: brand_name.into(),
            model_name: model_name.into(),
            year: None,
            description: String::new(),
            image_path: String::new(),
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

    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_rate: self.tax_rate,
            currency: self.currency,
        }
    }
}

/// A line item together with the totals the engine derived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    pub item: NewProformaItem,
    pub totals: LineTotals,
}

/// Quote header and lines as submitted for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaDraft {
    pub number: String,
    pub customer_id: i64,
    pub advisor_id: Option<i64>,
    pub customer_attention: String,
    pub template: EquipmentType,
    pub validity_days: u32,
    pub date: NaiveDate,
    pub custom_terms: String,
    pub custom_fiscal_note: String,
    pub notes: String,
    pub items: Vec<NewProformaItem>,
}

impl ProformaDraft {
    pub fn new(
        number: impl Into<String>,
        customer_id: i64,
        template: EquipmentType,
        date: NaiveDate,
    ) -> Self {
        Self {
            number: number.into(),
            customer_id,
            advisor_id: None,
            customer_attention: String::new(),
            template,
            validity_days: DEFAULT_VALIDITY_DAYS,
            date,
            custom_terms: String::new(),
            custom_fiscal_note: String::new(),
            notes: String::new(),
            items: Vec::new(),
        }
    }

    pub fn with_item(
        mut self,
        item: NewProformaItem,
    ) -> Self {
        self.items.push(item);
        self
    }
}

/// A fully priced quote ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProforma {
    pub number: String,
    pub customer_id: i64,
    pub advisor_id: Option<i64>,
    pub customer_attention: String,
    pub template: EquipmentType,
    pub validity_days: u32,
    pub date: NaiveDate,
    pub currency: QuoteCurrency,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub net_subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub custom_terms: String,
    pub custom_fiscal_note: String,
    pub notes: String,
    pub items: Vec<PricedItem>,
}

/// One row of a quote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaSummary {
    pub id: i64,
    pub number: String,
    pub date: NaiveDate,
    pub template: EquipmentType,
    pub currency: QuoteCurrency,
    pub total: Decimal,
    pub customer_name: String,
    pub customer_company: String,
    pub advisor_name: Option<String>,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaListFilter {
    pub customer_id: Option<i64>,
    pub template: Option<EquipmentType>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProformaListFilter {
    fn default() -> Self {
        Self {
            customer_id: None,
            template: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Search criteria for quotes. Every criterion is optional and they combine
/// with AND. Text criteria are case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaSearch {
    pub number: Option<String>,
    /// Matched against customer name and company.
    pub customer: Option<String>,
    /// Matched against the model and brand of any item.
    pub product: Option<String>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive; covers the whole day.
    pub date_to: Option<NaiveDate>,
    pub advisor_id: Option<i64>,
    pub template: Option<EquipmentType>,
    pub limit: i64,
}

impl Default for ProformaSearch {
    fn default() -> Self {
        Self {
            number: None,
            customer: None,
            product: None,
            date_from: None,
            date_to: None,
            advisor_id: None,
            template: None,
            limit: 100,
        }
    }
}

impl ProformaSearch {
    pub fn number_term(&self) -> Option<&str> {
        non_blank(&self.number)
    }

    pub fn customer_term(&self) -> Option<&str> {
        non_blank(&self.customer)
    }

    pub fn product_term(&self) -> Option<&str> {
        non_blank(&self.product)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Record counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProformaStats {
    pub customers: i64,
    pub active_customers: i64,
    pub advisors: i64,
    pub brands: i64,
    pub models: i64,
    pub proformas: i64,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn stored_item() -> ProformaItem {
        ProformaItem {
            id: 7,
            proforma_id: 3,
            model_id: Some(11),
            brand_name: "John Deere".to_string(),
            model_name: "5075E".to_string(),
            year: Some(2024),
            description: "75 hp".to_string(),
            image_path: String::new(),
            quantity: 2,
            unit_price: dec!(25000),
            discount_percent: dec!(5),
            discount_amount: dec!(2500.00),
            line_subtotal: dec!(50000),
            tax_rate: dec!(1),
            line_tax: dec!(475.00),
            line_total: dec!(47975.00),
            currency: Currency::Usd,
        }
    }

    #[test]
    fn stored_item_keeps_its_tax_rate_as_engine_input() {
        let line = stored_item().line_item();

        assert_eq!(line.tax_rate, Some(dec!(1)));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.currency, Currency::Usd);
    }

    #[test]
    fn copied_item_keeps_snapshot_and_rate() {
        let copy = stored_item().to_new_item();

        assert_eq!(copy.model_id, Some(11));
        assert_eq!(copy.unit_price, dec!(25000));
        assert_eq!(copy.tax_rate, Some(dec!(1)));
    }

    #[test]
    fn full_name_skips_missing_brand() {
        let mut item = stored_item();
        item.brand_name.clear();

        assert_eq!(item.full_name(), "5075E");
    }

    #[test]
    fn blank_search_terms_are_ignored() {
        let search = ProformaSearch {
            number: Some("  ".to_string()),
            customer: Some(" finca ".to_string()),
            ..Default::default()
        };

        assert_eq!(search.number_term(), None);
        assert_eq!(search.customer_term(), Some("finca"));
        assert_eq!(search.product_term(), None);
    }
}
