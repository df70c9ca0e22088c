mod advisor;
mod catalog;
mod config_entry;
mod currency;
mod customer;
mod equipment_type;
mod proforma;

pub use advisor::{Advisor, AdvisorUpdate, NewAdvisor};
pub use catalog::{Brand, EquipmentModel, EquipmentModelUpdate, ModelFilter, NewBrand, NewEquipmentModel};
pub use config_entry::{ConfigEntry, NewConfigEntry};
pub use currency::{Currency, QuoteCurrency};
pub use customer::{Customer, CustomerUpdate, NewCustomer, RecordFilter};
pub use equipment_type::EquipmentType;
pub use proforma::{
    DEFAULT_VALIDITY_DAYS, NewProforma, NewProformaItem, PricedItem, Proforma, ProformaDraft,
    ProformaItem, ProformaListFilter, ProformaSearch, ProformaStats, ProformaSummary,
};
