//! Field validation for records and quote headers.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::{CharLimitExceeded, validate_char_limit};
use crate::models::{NewAdvisor, NewCustomer, NewProformaItem, ProformaDraft};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
pub const MAX_VALIDITY_DAYS: u32 = 365;
pub const MAX_NUMBER_LEN: usize = 50;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Errors that can occur when validating user-entered fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error(transparent)]
    CharLimit(#[from] CharLimitExceeded),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("year {0} is outside {MIN_YEAR}-{MAX_YEAR}")]
    YearOutOfRange(i32),

    #[error("validity of {0} days is outside 1-{MAX_VALIDITY_DAYS}")]
    ValidityOutOfRange(u32),
}

fn required(
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Accepts an empty value; otherwise requires a `local@domain.tld` shape.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() || EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_year(year: Option<i32>) -> Result<(), ValidationError> {
    match year {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => Err(ValidationError::YearOutOfRange(y)),
        _ => Ok(()),
    }
}

pub fn validate_validity_days(days: u32) -> Result<(), ValidationError> {
    if (1..=MAX_VALIDITY_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(ValidationError::ValidityOutOfRange(days))
    }
}

pub fn validate_number(number: &str) -> Result<(), ValidationError> {
    required("number", number)?;
    if number.trim().chars().count() > MAX_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "number",
            max: MAX_NUMBER_LEN,
        });
    }
    Ok(())
}

pub fn validate_customer(customer: &NewCustomer) -> Result<(), ValidationError> {
    required("name", &customer.name)?;
    validate_char_limit("customer_name", customer.name.trim())?;
    validate_char_limit("customer_company", customer.company.trim())?;
    validate_email(&customer.email)
}

pub fn validate_advisor(advisor: &NewAdvisor) -> Result<(), ValidationError> {
    required("name", &advisor.name)?;
    validate_char_limit("advisor_name", advisor.name.trim())?;
    validate_char_limit("advisor_email", advisor.email.trim())?;
    validate_char_limit("advisor_phone", advisor.phone.trim())?;
    validate_email(&advisor.email)
}

/// Checks the non-numeric fields of a line. Amounts are checked by the
/// totals engine.
pub fn validate_item(item: &NewProformaItem) -> Result<(), ValidationError> {
    required("model", &item.model_name)?;
    validate_year(item.year)?;
    validate_char_limit("product_description", &item.description)?;
    Ok(())
}

pub fn validate_draft(draft: &ProformaDraft) -> Result<(), ValidationError> {
    validate_number(&draft.number)?;
    validate_validity_days(draft.validity_days)?;
    validate_char_limit("customer_attention", draft.customer_attention.trim())?;
    let terms_key = draft.template.terms_key();
    if !draft.custom_terms.trim().is_empty() {
        validate_char_limit(terms_key, &draft.custom_terms)?;
    }
    validate_char_limit("fiscal_note", &draft.custom_fiscal_note)?;
    draft.items.iter().try_for_each(validate_item)
}
