use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored configuration value (company identity, terms, fiscal note).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    /// One of `general`, `company`, `tractor`, `implement`.
    pub category: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

/// For upserting configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfigEntry {
    pub key: String,
    pub value: String,
    pub category: String,
    pub description: String,
}

impl NewConfigEntry {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            category: "general".to_string(),
            description: String::new(),
        }
    }
}
