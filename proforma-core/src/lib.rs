pub mod calculations;
pub mod config;
pub mod db;
pub mod document;
pub mod models;
pub mod numbering;
pub mod service;
pub mod validation;

pub use calculations::{LineItem, LineTotals, QuoteTotals, TotalsEngine, TotalsError};
pub use config::QuoteConfig;
pub use db::repository::{QuoteRepository, RepositoryError};
pub use models::*;
pub use service::{QuoteService, ServiceError};
