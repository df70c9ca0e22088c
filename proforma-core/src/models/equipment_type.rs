use serde::{Deserialize, Serialize};

/// Kind of equipment a brand sells. Also selects the proforma template,
/// which decides the terms printed in the footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentType {
    Tractor,
    #[default]
    Implement,
}

impl EquipmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tractor => "tractor",
            Self::Implement => "implement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tractor" => Some(Self::Tractor),
            "implement" => Some(Self::Implement),
            _ => None,
        }
    }

    /// Title printed in the document header band.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Tractor => "PROFORMA - TRACTOR",
            Self::Implement => "PROFORMA - IMPLEMENTO",
        }
    }

    /// Configuration key holding the default terms for this template.
    pub fn terms_key(&self) -> &'static str {
        match self {
            Self::Tractor => "terms_tractor",
            Self::Implement => "terms_implement",
        }
    }
}

impl std::fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EquipmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| format!("Invalid equipment type: {s}. Use tractor or implement"))
    }
}
