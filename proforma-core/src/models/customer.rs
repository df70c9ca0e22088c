use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For creating new customers (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub active: bool,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            ..Default::default()
        }
    }

    /// Returns a copy with every text field trimmed.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            company: self.company.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            active: self.active,
        }
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
}

impl CustomerUpdate {
    pub fn apply(&self, customer: &mut Customer) {
        apply_text(&mut customer.name, &self.name);
        apply_text(&mut customer.company, &self.company);
        apply_text(&mut customer.email, &self.email);
        apply_text(&mut customer.phone, &self.phone);
        apply_text(&mut customer.address, &self.address);
        if let Some(active) = self.active {
            customer.active = active;
        }
    }
}

pub(crate) fn apply_text(
    target: &mut String,
    value: &Option<String>,
) {
    if let Some(value) = value {
        *target = value.trim().to_string();
    }
}

/// Filter shared by the customer and advisor listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub active_only: bool,
    /// Case-insensitive substring matched against the searchable columns.
    pub search: Option<String>,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            active_only: true,
            search: None,
        }
    }
}

impl RecordFilter {
    pub fn all() -> Self {
        Self {
            active_only: false,
            search: None,
        }
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Default::default()
        }
    }

    /// The search term, ignoring blank input.
    pub fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn stored() -> Customer {
        Customer {
            id: 1,
            name: "Finca La Esperanza".to_string(),
            company: String::new(),
            email: String::new(),
            phone: "8888-0000".to_string(),
            address: String::new(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let mut customer = stored();
        let update = CustomerUpdate {
            email: Some("  compras@esperanza.cr ".to_string()),
            active: Some(false),
            ..Default::default()
        };

        update.apply(&mut customer);

        assert_eq!(customer.email, "compras@esperanza.cr");
        assert_eq!(customer.phone, "8888-0000");
        assert!(!customer.active);
    }

    #[test]
    fn blank_search_term_is_ignored() {
        assert_eq!(RecordFilter::search("   ").term(), None);
        assert_eq!(RecordFilter::search(" finca ").term(), Some("finca"));
    }
}
