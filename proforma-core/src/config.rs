//! Quote configuration: defaults, stored overrides and text limits.
//!
//! [`QuoteConfig`] is an explicit value handed to the engine, the service and
//! the document renderer. It starts from built-in defaults, may be read from
//! a TOML file by the CLI, and is then overlaid with the key/value rows kept
//! in the configuration table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::{DEFAULT_TAX_RATE, TotalsEngine};
use crate::models::{DEFAULT_VALIDITY_DAYS, EquipmentType, NewConfigEntry};

/// Maximum length, in characters, of each fixed document section.
pub const MAX_CHARS: &[(&str, usize)] = &[
    ("company_name", 60),
    ("company_address", 150),
    ("company_phone", 30),
    ("company_email", 50),
    ("company_web", 50),
    ("advisor_name", 60),
    ("advisor_email", 50),
    ("advisor_phone", 30),
    ("terms_tractor", 800),
    ("terms_implement", 800),
    ("fiscal_note", 400),
    ("customer_name", 80),
    ("customer_company", 80),
    ("customer_attention", 80),
    ("product_description", 1000),
];

const TERMS_TRACTOR: &str = "Incluye:
1. El lugar de entrega es en las instalaciones del comprador en el territorio costarricense, sin costo.
2. El período de garantía es de Doce (12) meses sin límite de hora a partir de la fecha de entrega. Esta Garantía es ante defectos de fabricación o cualquier anomalía debido a inconvenientes de manufactura y/o materias primas que afecten el funcionamiento normal del equipo.
3. Gastos de inscripción y placas metálicas.
4. Tiempo de Entrega: A convenir con el cliente.
5. Entrega técnica.";

const TERMS_IMPLEMENT: &str = "Incluye:
1. El lugar de entrega es en las instalaciones del comprador en el territorio costarricense, sin costo.
2. Capacitación de operadores.
3. El período de garantía es de seis (6) meses sobre el equipo.";

const FISCAL_NOTE: &str = "Al estar registrado ante la autoridad tributaria como productor de productos e insumos agropecuarios, podrá gestionar la exoneración del IVA a través del departamento correspondiente del Ministerio de Hacienda.";

/// Returns the character limit for `key`, if it has one.
pub fn max_chars(key: &str) -> Option<usize> {
    MAX_CHARS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, max)| *max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{key} exceeds the limit of {max} characters ({actual}/{max})")]
pub struct CharLimitExceeded {
    pub key: &'static str,
    pub max: usize,
    pub actual: usize,
}

/// Checks `value` against the limit for `key` and returns its length in
/// characters. Keys without a limit always pass.
pub fn validate_char_limit(
    key: &str,
    value: &str,
) -> Result<usize, CharLimitExceeded> {
    let actual = value.chars().count();
    match MAX_CHARS.iter().find(|(k, _)| *k == key) {
        Some((key, max)) if actual > *max => Err(CharLimitExceeded {
            key: *key,
            max: *max,
            actual,
        }),
        _ => Ok(actual),
    }
}

/// Company identity printed in the document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub web: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Colono".to_string(),
            address: "Limón, Pococí, Guápiles".to_string(),
            phone: "+506 2799-6120".to_string(),
            email: "ventas@colono.cr".to_string(),
            web: "www.colono.cr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub default_tax_rate: Decimal,
    pub default_validity_days: u32,
    pub company: CompanyInfo,
    pub terms_tractor: String,
    pub terms_implement: String,
    pub fiscal_note: String,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            default_tax_rate: DEFAULT_TAX_RATE,
            default_validity_days: DEFAULT_VALIDITY_DAYS,
            company: CompanyInfo::default(),
            terms_tractor: TERMS_TRACTOR.to_string(),
            terms_implement: TERMS_IMPLEMENT.to_string(),
            fiscal_note: FISCAL_NOTE.to_string(),
        }
    }
}

impl QuoteConfig {
    /// Totals engine using this configuration's default tax rate.
    pub fn engine(&self) -> TotalsEngine {
        TotalsEngine::new(self.default_tax_rate)
    }

    pub fn terms_for(
        &self,
        template: EquipmentType,
    ) -> &str {
        match template {
            EquipmentType::Tractor => &self.terms_tractor,
            EquipmentType::Implement => &self.terms_implement,
        }
    }

    /// Looks up a value by its stored configuration key.
    pub fn get(
        &self,
        key: &str,
    ) -> Option<String> {
        let value = match key {
            "company_name" => self.company.name.clone(),
            "company_address" => self.company.address.clone(),
            "company_phone" => self.company.phone.clone(),
            "company_email" => self.company.email.clone(),
            "company_web" => self.company.web.clone(),
            "terms_tractor" => self.terms_tractor.clone(),
            "terms_implement" => self.terms_implement.clone(),
            "fiscal_note" => self.fiscal_note.clone(),
            "default_tax_rate" => self.default_tax_rate.normalize().to_string(),
            "default_validity_days" => self.default_validity_days.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Returns a copy with the given key/value pairs applied on top.
    ///
    /// Unknown keys are ignored. Numeric keys that fail to parse keep their
    /// current value.
    pub fn with_overrides<I, K, V>(
        &self,
        entries: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = self.clone();
        for (key, value) in entries {
            config.set(key.as_ref(), value.as_ref());
        }
        config
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
    ) {
        match key {
            "company_name" => self.company.name = value.to_string(),
            "company_address" => self.company.address = value.to_string(),
            "company_phone" => self.company.phone = value.to_string(),
            "company_email" => self.company.email = value.to_string(),
            "company_web" => self.company.web = value.to_string(),
            "terms_tractor" => self.terms_tractor = value.to_string(),
            "terms_implement" => self.terms_implement = value.to_string(),
            "fiscal_note" => self.fiscal_note = value.to_string(),
            "default_tax_rate" => match value.trim().parse::<Decimal>() {
                Ok(rate) => self.default_tax_rate = rate,
                Err(e) => warn!(value, error = %e, "ignoring invalid default_tax_rate"),
            },
            "default_validity_days" => match value.trim().parse::<u32>() {
                Ok(days) => self.default_validity_days = days,
                Err(e) => warn!(value, error = %e, "ignoring invalid default_validity_days"),
            },
            other => debug!(key = other, "ignoring unknown configuration key"),
        }
    }

    /// The stored rows that reproduce this configuration, with their
    /// categories and descriptions.
    pub fn entries(&self) -> Vec<NewConfigEntry> {
        const KEYS: &[(&str, &str, &str)] = &[
            ("company_name", "company", "Nombre de la empresa"),
            ("company_address", "company", "Dirección física de la empresa"),
            ("company_phone", "company", "Teléfono de contacto"),
            ("company_email", "company", "Correo electrónico principal"),
            ("company_web", "company", "Sitio web"),
            ("terms_tractor", "tractor", "Términos y condiciones para tractores"),
            ("terms_implement", "implement", "Términos y condiciones para implementos"),
            ("fiscal_note", "general", "Nota fiscal sobre exoneración de IVA"),
        ];

        KEYS.iter()
            .filter_map(|(key, category, description)| {
                self.get(key).map(|value| NewConfigEntry {
                    key: key.to_string(),
                    value,
                    category: category.to_string(),
                    description: description.to_string(),
                })
            })
            .collect()
    }
}
