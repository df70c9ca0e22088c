use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Advisor, AdvisorUpdate, Brand, ConfigEntry, Customer, CustomerUpdate, EquipmentModel,
    EquipmentModelUpdate, EquipmentType, ModelFilter, NewAdvisor, NewBrand, NewConfigEntry,
    NewCustomer, NewEquipmentModel, NewProforma, Proforma, ProformaListFilter, ProformaSearch,
    ProformaStats, ProformaSummary, RecordFilter,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for the catalog, the business records and the quotes.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    // Customers
    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<Customer, RepositoryError>;
    async fn get_customer(
        &self,
        id: i64,
    ) -> Result<Customer, RepositoryError>;
    async fn update_customer(
        &self,
        id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError>;
    async fn delete_customer(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;
    /// Ordered by name. Search covers name, company and email.
    async fn list_customers(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<Customer>, RepositoryError>;

    // Advisors
    async fn create_advisor(
        &self,
        advisor: NewAdvisor,
    ) -> Result<Advisor, RepositoryError>;
    async fn get_advisor(
        &self,
        id: i64,
    ) -> Result<Advisor, RepositoryError>;
    async fn update_advisor(
        &self,
        id: i64,
        update: &AdvisorUpdate,
    ) -> Result<Advisor, RepositoryError>;
    async fn delete_advisor(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;
    /// Ordered by name. Search covers name and email.
    async fn list_advisors(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<Advisor>, RepositoryError>;

    // Brands
    async fn create_brand(
        &self,
        brand: NewBrand,
    ) -> Result<Brand, RepositoryError>;
    async fn get_brand(
        &self,
        id: i64,
    ) -> Result<Brand, RepositoryError>;
    async fn get_brand_by_name(
        &self,
        name: &str,
    ) -> Result<Brand, RepositoryError>;
    async fn list_brands(
        &self,
        equipment_type: Option<EquipmentType>,
        active_only: bool,
    ) -> Result<Vec<Brand>, RepositoryError>;
    /// Also deletes the brand's models.
    async fn delete_brand(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    // Equipment models
    async fn create_model(
        &self,
        model: NewEquipmentModel,
    ) -> Result<EquipmentModel, RepositoryError>;
    async fn get_model(
        &self,
        id: i64,
    ) -> Result<EquipmentModel, RepositoryError>;
    async fn get_model_by_name(
        &self,
        brand_id: i64,
        name: &str,
    ) -> Result<EquipmentModel, RepositoryError>;
    async fn update_model(
        &self,
        id: i64,
        update: &EquipmentModelUpdate,
    ) -> Result<EquipmentModel, RepositoryError>;
    async fn delete_model(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;
    /// Ordered by brand name, then model name.
    async fn list_models(
        &self,
        filter: &ModelFilter,
    ) -> Result<Vec<EquipmentModel>, RepositoryError>;

    // Configuration
    async fn get_config(
        &self,
        key: &str,
    ) -> Result<ConfigEntry, RepositoryError>;
    /// Inserts or replaces the value stored under `entry.key`.
    async fn set_config(
        &self,
        entry: NewConfigEntry,
    ) -> Result<ConfigEntry, RepositoryError>;
    async fn list_config(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ConfigEntry>, RepositoryError>;

    // Proformas
    /// Inserts the header and every item atomically.
    ///
    /// Returns [`RepositoryError::Duplicate`] if the number is taken.
    async fn create_proforma(
        &self,
        proforma: NewProforma,
    ) -> Result<Proforma, RepositoryError>;
    async fn get_proforma(
        &self,
        id: i64,
    ) -> Result<Proforma, RepositoryError>;
    async fn get_proforma_by_number(
        &self,
        number: &str,
    ) -> Result<Proforma, RepositoryError>;
    /// Newest first.
    async fn list_proformas(
        &self,
        filter: &ProformaListFilter,
    ) -> Result<Vec<ProformaSummary>, RepositoryError>;
    /// Newest first.
    async fn search_proformas(
        &self,
        search: &ProformaSearch,
    ) -> Result<Vec<ProformaSummary>, RepositoryError>;
    async fn set_document_path(
        &self,
        id: i64,
        path: &str,
    ) -> Result<(), RepositoryError>;
    /// Also deletes the proforma's items.
    async fn delete_proforma(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    async fn stats(&self) -> Result<ProformaStats, RepositoryError>;
}
