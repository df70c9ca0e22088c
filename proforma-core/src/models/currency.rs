use serde::{Deserialize, Serialize};

/// Currencies a quote line can be priced in. Amounts in different
/// currencies are never converted into one another.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Costa Rican colón.
    #[default]
    Crc,
    /// United States dollar.
    Usd,
}

impl Currency {
    pub fn all() -> &'static [Currency] {
        &[Currency::Crc, Currency::Usd]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crc => "CRC",
            Self::Usd => "USD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRC" => Some(Self::Crc),
            "USD" => Some(Self::Usd),
            _ => None,
        }
    }

    /// Prefix used when printing amounts.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Crc => "₡",
            Self::Usd => "$",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid currency: {s}. Use CRC or USD"))
    }
}

/// Currency marker stored on a proforma header.
///
/// Multi-currency quotes carry `Mixed`; their authoritative breakdown is the
/// per-currency totals recomputed from the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteCurrency {
    Single(Currency),
    Mixed,
}

impl QuoteCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single(currency) => currency.as_str(),
            Self::Mixed => "MIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("MIXED") {
            return Some(Self::Mixed);
        }
        Currency::parse(s).map(Self::Single)
    }
}

impl Default for QuoteCurrency {
    fn default() -> Self {
        Self::Single(Currency::default())
    }
}

impl std::fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
