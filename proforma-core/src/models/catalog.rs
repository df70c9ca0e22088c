use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EquipmentType;
use super::customer::apply_text;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub equipment_type: EquipmentType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBrand {
    pub name: String,
    pub equipment_type: EquipmentType,
    pub active: bool,
}

impl NewBrand {
    pub fn new(
        name: impl Into<String>,
        equipment_type: EquipmentType,
    ) -> Self {
        Self {
            name: name.into(),
            equipment_type,
            active: true,
        }
    }
}

/// An equipment model in the catalog. `brand_name` is joined in on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentModel {
    pub id: i64,
    pub brand_id: i64,
    pub brand_name: String,
    pub name: String,
    /// Technical specifications.
    pub description: String,
    pub base_price: Decimal,
    pub image_path: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentModel {
    /// Brand followed by model, e.g. "John Deere 5075E".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.brand_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEquipmentModel {
    pub brand_id: i64,
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub image_path: String,
    pub active: bool,
}

impl NewEquipmentModel {
    pub fn new(
        brand_id: i64,
        name: impl Into<String>,
        base_price: Decimal,
    ) -> Self {
        Self {
            brand_id,
            name: name.into(),
            description: String::new(),
            base_price,
            image_path: String::new(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquipmentModelUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub image_path: Option<String>,
    pub active: Option<bool>,
}

impl EquipmentModelUpdate {
    pub fn apply(&self, model: &mut EquipmentModel) {
        apply_text(&mut model.name, &self.name);
        apply_text(&mut model.description, &self.description);
        apply_text(&mut model.image_path, &self.image_path);
        if let Some(price) = self.base_price {
            model.base_price = price;
        }
        if let Some(active) = self.active {
            model.active = active;
        }
    }
}

/// Filter for catalog model listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFilter {
    pub brand_id: Option<i64>,
    pub equipment_type: Option<EquipmentType>,
    pub active_only: bool,
}

impl Default for ModelFilter {
    fn default() -> Self {
        Self {
            brand_id: None,
            equipment_type: None,
            active_only: true,
        }
    }
}
