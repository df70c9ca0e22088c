//! Quote workflows that combine the totals engine with a repository.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculations::{QuoteTotals, TotalsEngine, TotalsError};
use crate::config::QuoteConfig;
use crate::db::{QuoteRepository, RepositoryError};
use crate::document::{Document, DocumentSource};
use crate::models::{
    Currency, NewProforma, NewProformaItem, PricedItem, Proforma, ProformaDraft, QuoteCurrency,
};
use crate::numbering::quote_number;
use crate::validation::{ValidationError, validate_draft};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Totals(#[from] TotalsError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("proforma number '{0}' already exists")]
    DuplicateNumber(String),
}

/// Header values cached on a stored proforma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTotals {
    pub currency: QuoteCurrency,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub net_subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl From<&QuoteTotals> for CachedTotals {
    /// Multi-currency quotes cache zeros; their breakdown only exists per
    /// currency.
    fn from(totals: &QuoteTotals) -> Self {
        match totals.single() {
            Some(t) => Self {
                currency: totals.quote_currency(),
                subtotal: t.subtotal,
                discount: t.discount,
                net_subtotal: t.net_subtotal,
                tax: t.tax,
                total: t.total,
            },
            None => Self {
                currency: QuoteCurrency::Mixed,
                subtotal: Decimal::ZERO,
                discount: Decimal::ZERO,
                net_subtotal: Decimal::ZERO,
                tax: Decimal::ZERO,
                total: Decimal::ZERO,
            },
        }
    }
}

/// Prices draft lines and assembles the record to persist.
pub fn price_draft(
    engine: &TotalsEngine,
    draft: ProformaDraft,
) -> Result<(NewProforma, QuoteTotals), ServiceError> {
    let items = draft
        .items
        .into_iter()
        .map(|item| {
            let totals = engine.line_totals(&item.to_line_item())?;
            Ok(PricedItem { item, totals })
        })
        .collect::<Result<Vec<_>, TotalsError>>()?;

    let lines: Vec<_> = items.iter().map(|p| p.totals.clone()).collect();
    let totals = engine.aggregate(&lines)?;
    let cached = CachedTotals::from(&totals);

    let proforma = NewProforma {
        number: draft.number.trim().to_string(),
        customer_id: draft.customer_id,
        advisor_id: draft.advisor_id,
        customer_attention: draft.customer_attention.trim().to_string(),
        template: draft.template,
        validity_days: draft.validity_days,
        date: draft.date,
        currency: cached.currency,
        subtotal: cached.subtotal,
        discount: cached.discount,
        net_subtotal: cached.net_subtotal,
        tax: cached.tax,
        total: cached.total,
        custom_terms: draft.custom_terms,
        custom_fiscal_note: draft.custom_fiscal_note,
        notes: draft.notes,
        items,
    };

    Ok((proforma, totals))
}

/// Orchestrates quote creation, copying and rendering over a repository.
pub struct QuoteService<'a, R: QuoteRepository + ?Sized> {
    repo: &'a R,
    config: QuoteConfig,
}

impl<'a, R: QuoteRepository + ?Sized> QuoteService<'a, R> {
    pub fn new(
        repo: &'a R,
        config: QuoteConfig,
    ) -> Self {
        Self { repo, config }
    }

    /// Builds a service whose configuration is `base` overlaid with the
    /// stored configuration rows.
    pub async fn with_stored_config(
        repo: &'a R,
        base: QuoteConfig,
    ) -> Result<Self, ServiceError> {
        let entries = repo.list_config(None).await?;
        debug!(entries = entries.len(), "applying stored configuration");
        let config = base.with_overrides(entries.into_iter().map(|e| (e.key, e.value)));
        Ok(Self::new(repo, config))
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    pub fn engine(&self) -> TotalsEngine {
        self.config.engine()
    }

    pub fn next_number(
        &self,
        now: NaiveDateTime,
    ) -> String {
        quote_number(now)
    }

    /// Snapshots a catalog model into a new line priced at its base price.
    pub async fn priced_item_from_catalog(
        &self,
        model_id: i64,
        quantity: u32,
        currency: Currency,
    ) -> Result<NewProformaItem, ServiceError> {
        let model = self.repo.get_model(model_id).await?;

        Ok(NewProformaItem {
            model_id: Some(model.id),
            brand_name: model.brand_name,
            model_name: model.name,
            year: None,
            description: model.description,
            image_path: model.image_path,
            quantity,
            unit_price: model.base_price,
            discount_percent: Decimal::ZERO,
            tax_rate: None,
            currency,
        })
    }

    /// Validates, prices and stores a new quote.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] for malformed header or line fields.
    /// * [`ServiceError::DuplicateNumber`] if the number is already used.
    /// * [`ServiceError::Totals`] for out-of-range amounts.
    /// * [`ServiceError::Repository`] if the customer or advisor does not
    ///   exist or the store fails.
    pub async fn create_proforma(
        &self,
        draft: ProformaDraft,
    ) -> Result<Proforma, ServiceError> {
        if let Err(e) = validate_draft(&draft) {
            warn!(number = %draft.number, error = %e, "rejected proforma");
            return Err(e.into());
        }

        let number = draft.number.trim().to_string();
        match self.repo.get_proforma_by_number(&number).await {
            Ok(_) => return Err(ServiceError::DuplicateNumber(number)),
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        self.repo.get_customer(draft.customer_id).await?;
        if let Some(advisor_id) = draft.advisor_id {
            self.repo.get_advisor(advisor_id).await?;
        }

        let (record, totals) = price_draft(&self.engine(), draft)?;
        debug!(number = %number, currencies = ?totals.currencies(), "priced proforma");

        let proforma = self
            .repo
            .create_proforma(record)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => ServiceError::DuplicateNumber(number.clone()),
                other => other.into(),
            })?;

        info!(
            id = proforma.id,
            number = %proforma.number,
            items = proforma.items.len(),
            currency = %proforma.currency,
            "created proforma"
        );
        Ok(proforma)
    }

    /// Copies a quote, header and items with their tax rates, under a new
    /// number and date. All totals are derived again.
    pub async fn duplicate_proforma(
        &self,
        id: i64,
        new_number: &str,
        date: NaiveDate,
    ) -> Result<Proforma, ServiceError> {
        let source = self.repo.get_proforma(id).await?;

        let draft = ProformaDraft {
            number: new_number.to_string(),
            customer_id: source.customer_id,
            advisor_id: source.advisor_id,
            customer_attention: source.customer_attention.clone(),
            template: source.template,
            validity_days: source.validity_days,
            date,
            custom_terms: source.custom_terms.clone(),
            custom_fiscal_note: source.custom_fiscal_note.clone(),
            notes: source.notes.clone(),
            items: source.items.iter().map(|i| i.to_new_item()).collect(),
        };

        debug!(source = %source.number, number = new_number, "duplicating proforma");
        self.create_proforma(draft).await
    }

    /// Recomputes the totals from the stored items.
    pub fn quote_totals(
        &self,
        proforma: &Proforma,
    ) -> Result<QuoteTotals, ServiceError> {
        Ok(self.engine().quote_totals(&proforma.line_items())?)
    }

    /// Lays out the document for a stored quote.
    ///
    /// A missing advisor is left off the footer rather than failing.
    pub async fn build_document(
        &self,
        proforma: &Proforma,
    ) -> Result<Document, ServiceError> {
        let customer = self.repo.get_customer(proforma.customer_id).await?;
        let advisor = match proforma.advisor_id {
            Some(id) => match self.repo.get_advisor(id).await {
                Ok(advisor) => Some(advisor),
                Err(RepositoryError::NotFound) => {
                    warn!(advisor_id = id, number = %proforma.number, "advisor not found");
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        let totals = self.quote_totals(proforma)?;

        Ok(Document::build(DocumentSource {
            proforma,
            customer: &customer,
            advisor: advisor.as_ref(),
            config: &self.config,
            totals: &totals,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::EquipmentType;

    fn draft() -> ProformaDraft {
        ProformaDraft::new(
            " PF-20250110-090000 ",
            1,
            EquipmentType::Implement,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        )
    }

    #[test]
    fn price_draft_caches_single_currency_totals() {
        let draft = draft()
            .with_item(NewProformaItem::new("Kuhn", "BD-300", 1, dec!(1000), Currency::Crc))
            .with_item(NewProformaItem::new("Kuhn", "BD-400", 2, dec!(500), Currency::Crc));

        let (record, totals) = price_draft(&TotalsEngine::default(), draft).unwrap();

        assert_eq!(record.number, "PF-20250110-090000");
        assert_eq!(record.currency, QuoteCurrency::Single(Currency::Crc));
        assert_eq!(record.subtotal, dec!(2000));
        assert_eq!(record.tax, dec!(260.00));
        assert_eq!(record.total, dec!(2260.00));
        assert_eq!(record.items[1].totals.line_total, dec!(1130.00));
        assert_eq!(totals.single().unwrap().total, record.total);
    }

    #[test]
    fn price_draft_marks_mixed_currency_with_zero_cache() {
        let draft = draft()
            .with_item(NewProformaItem::new("Kuhn", "BD-300", 1, dec!(100), Currency::Usd))
            .with_item(NewProformaItem::new("Kuhn", "BD-400", 1, dec!(1000), Currency::Crc));

        let (record, totals) = price_draft(&TotalsEngine::default(), draft).unwrap();

        assert_eq!(record.currency, QuoteCurrency::Mixed);
        assert_eq!(record.total, Decimal::ZERO);
        assert_eq!(totals.get(Currency::Usd).unwrap().total, dec!(113.00));
    }

    #[test]
    fn price_draft_rejects_invalid_line() {
        let draft = draft().with_item(
            NewProformaItem::new("Kuhn", "BD-300", 1, dec!(100), Currency::Usd)
                .with_discount(dec!(120)),
        );

        let err = price_draft(&TotalsEngine::default(), draft).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Totals(TotalsError::InvalidInput {
                field: "discount_percent",
                ..
            })
        ));
    }

    #[test]
    fn empty_draft_prices_to_zero() {
        let (record, totals) = price_draft(&TotalsEngine::default(), draft()).unwrap();

        assert!(totals.is_empty());
        assert_eq!(record.currency, QuoteCurrency::Single(Currency::Crc));
        assert_eq!(record.total, Decimal::ZERO);
    }
}
