use std::io::Read;

use proforma_core::{
    Brand, EquipmentModelUpdate, EquipmentType, NewBrand, NewEquipmentModel, QuoteRepository,
    RepositoryError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading catalog data.
#[derive(Debug, Error)]
pub enum CatalogLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Model '{brand} {model}' has a negative base price ({price})")]
    NegativePrice {
        brand: String,
        model: String,
        price: Decimal,
    },

    #[error("Brand '{brand}' is registered as {existing}, but the file lists it as {requested}")]
    BrandTypeMismatch {
        brand: String,
        existing: EquipmentType,
        requested: EquipmentType,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for CatalogLoaderError {
    fn from(err: csv::Error) -> Self {
        CatalogLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the catalog CSV file.
///
/// Columns:
/// - `brand`: brand name, created if missing
/// - `equipment_type`: `tractor` or `implement`
/// - `model`: model name, unique within its brand
/// - `description`: technical specifications (optional)
/// - `base_price`: list price
/// - `image_path`: product image (optional)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogRecord {
    pub brand: String,
    #[serde(deserialize_with = "deserialize_equipment_type")]
    pub equipment_type: EquipmentType,
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub image_path: String,
}

fn deserialize_equipment_type<'de, D>(deserializer: D) -> Result<EquipmentType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<EquipmentType>()
        .map_err(serde::de::Error::custom)
}

/// Counts reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub brands_created: usize,
    pub models_created: usize,
    pub models_updated: usize,
}

/// Loads catalog brands and models from CSV through any [`QuoteRepository`].
///
/// Loading is an upsert keyed on brand name and model name, so running the
/// same file twice leaves the catalog unchanged.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Parse catalog records from a CSV reader. Fields are trimmed.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<CatalogRecord>, CatalogLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            let record: CatalogRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upserts the records into the catalog.
    ///
    /// Existing models get their description, price and image replaced and
    /// are marked active again. Records are checked before anything is
    /// written.
    pub async fn load<R: QuoteRepository + ?Sized>(
        repo: &R,
        records: &[CatalogRecord],
    ) -> Result<LoadSummary, CatalogLoaderError> {
        if let Some(bad) = records.iter().find(|r| r.base_price.is_sign_negative()) {
            return Err(CatalogLoaderError::NegativePrice {
                brand: bad.brand.clone(),
                model: bad.model.clone(),
                price: bad.base_price,
            });
        }

        let mut summary = LoadSummary::default();

        for record in records {
            let brand = Self::ensure_brand(repo, record, &mut summary).await?;

            match repo.get_model_by_name(brand.id, &record.model).await {
                Ok(existing) => {
                    let update = EquipmentModelUpdate {
                        description: Some(record.description.clone()),
                        base_price: Some(record.base_price),
                        image_path: Some(record.image_path.clone()),
                        active: Some(true),
                        ..Default::default()
                    };
                    repo.update_model(existing.id, &update).await?;
                    summary.models_updated += 1;
                    debug!(brand = %brand.name, model = %record.model, "updated model");
                }
                Err(RepositoryError::NotFound) => {
                    repo.create_model(NewEquipmentModel {
                        description: record.description.clone(),
                        image_path: record.image_path.clone(),
                        ..NewEquipmentModel::new(brand.id, record.model.clone(), record.base_price)
                    })
                    .await?;
                    summary.models_created += 1;
                    debug!(brand = %brand.name, model = %record.model, "created model");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            brands_created = summary.brands_created,
            models_created = summary.models_created,
            models_updated = summary.models_updated,
            "catalog loaded"
        );
        Ok(summary)
    }

    async fn ensure_brand<R: QuoteRepository + ?Sized>(
        repo: &R,
        record: &CatalogRecord,
        summary: &mut LoadSummary,
    ) -> Result<Brand, CatalogLoaderError> {
        match repo.get_brand_by_name(&record.brand).await {
            Ok(brand) if brand.equipment_type != record.equipment_type => {
                Err(CatalogLoaderError::BrandTypeMismatch {
                    brand: brand.name,
                    existing: brand.equipment_type,
                    requested: record.equipment_type,
                })
            }
            Ok(brand) => Ok(brand),
            Err(RepositoryError::NotFound) => {
                let brand = repo
                    .create_brand(NewBrand::new(record.brand.clone(), record.equipment_type))
                    .await?;
                summary.brands_created += 1;
                Ok(brand)
            }
            Err(e) => Err(e.into()),
        }
    }
}
