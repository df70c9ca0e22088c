//! Application settings file.
//!
//! An optional TOML file whose keys mirror [`QuoteConfig`]. Missing keys keep
//! their defaults:
//!
//! ```toml
//! default_tax_rate = "13"
//! default_validity_days = 30
//!
//! [company]
//! name = "Agro Norte"
//! phone = "+506 2222-0000"
//! ```
use std::path::Path;

use anyhow::{Context, Result};
use proforma_core::QuoteConfig;
use tracing::debug;

/// Parses settings from TOML text.
pub fn parse(text: &str) -> Result<QuoteConfig> {
    toml::from_str(text).context("invalid settings file")
}

/// Reads the settings file, or returns the defaults when `path` is `None`.
pub fn load(path: Option<&Path>) -> Result<QuoteConfig> {
    let Some(path) = path else {
        return Ok(QuoteConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("in {}", path.display()))?;
    debug!(path = %path.display(), "loaded settings");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), QuoteConfig::default());
    }

    #[test]
    fn partial_company_table_keeps_other_fields() {
        let config = parse(
            r#"
            default_tax_rate = "4"
            default_validity_days = 30

            [company]
            name = "Agro Norte"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_tax_rate, dec!(4));
        assert_eq!(config.default_validity_days, 30);
        assert_eq!(config.company.name, "Agro Norte");
        assert_eq!(config.company.web, QuoteConfig::default().company.web);
        assert_eq!(config.terms_tractor, QuoteConfig::default().terms_tractor);
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(parse("default_validity_days = \"many\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/proforma.toml"))).unwrap_err();

        assert!(err.to_string().starts_with("Failed to read settings file"));
    }
}
