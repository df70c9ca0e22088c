use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::apply_text;

/// A sales advisor printed in the document footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewAdvisor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
}

impl NewAdvisor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            ..Default::default()
        }
    }

    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvisorUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

impl AdvisorUpdate {
    pub fn apply(&self, advisor: &mut Advisor) {
        apply_text(&mut advisor.name, &self.name);
        apply_text(&mut advisor.email, &self.email);
        apply_text(&mut advisor.phone, &self.phone);
        if let Some(active) = self.active {
            advisor.active = active;
        }
    }
}
