use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use proforma_core::{Currency, EquipmentType};
use rust_decimal::Decimal;

use crate::logging::LoggingOptions;
use crate::utils::parse_date;

fn decimal_arg(s: &str) -> Result<Decimal, String> {
    crate::utils::parse_decimal(s).map_err(|e| e.to_string())
}

/// Quotations for agricultural equipment.
#[derive(Debug, Parser)]
#[command(name = "proforma", version, about, long_about = None)]
pub struct Cli {
    /// Database backend to use.
    #[arg(long, default_value = "sqlite", global = true)]
    pub backend: String,

    /// Database connection string. For SQLite this is a file path
    /// (e.g. `proforma.db`), a `sqlite:` url or `:memory:`.
    #[arg(long, default_value = "proforma.db", global = true)]
    pub db: String,

    /// TOML settings file with company data, terms and defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (overrides RUST_LOG).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Hide log output on the console.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            level: self.log_level.clone(),
            log_file: self.log_file.clone(),
            quiet: self.quiet,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute totals for a line-item CSV and print them as JSON.
    Totals(TotalsArgs),
    /// Manage customers.
    #[command(subcommand)]
    Customer(PartyCommand),
    /// Manage sales advisors.
    #[command(subcommand)]
    Advisor(PartyCommand),
    /// Manage catalog brands.
    #[command(subcommand)]
    Brand(BrandCommand),
    /// Manage catalog models.
    #[command(subcommand)]
    Model(ModelCommand),
    /// Create, find and render quotes.
    #[command(subcommand)]
    Quote(QuoteCommand),
    /// Read and change stored configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show record counts.
    Stats,
}

#[derive(Debug, Args)]
pub struct TotalsArgs {
    /// Line-item CSV file.
    #[arg(long)]
    pub items: PathBuf,

    /// Rate applied to lines without their own tax rate.
    #[arg(long, value_parser = decimal_arg)]
    pub default_tax_rate: Option<Decimal>,
}

/// Fields shared by customers and advisors. `company` and `address` only
/// apply to customers.
#[derive(Debug, Args, Default)]
pub struct PartyFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum PartyCommand {
    Add {
        #[command(flatten)]
        fields: PartyFields,
    },
    List {
        /// Case-insensitive substring of name, company or email.
        #[arg(long)]
        search: Option<String>,
        /// Include inactive records.
        #[arg(long)]
        all: bool,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[command(flatten)]
        fields: PartyFields,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum BrandCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        equipment_type: EquipmentType,
    },
    List {
        #[arg(long = "type")]
        equipment_type: Option<EquipmentType>,
        #[arg(long)]
        all: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    Add {
        /// Brand name; the brand must exist.
        #[arg(long)]
        brand: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = decimal_arg)]
        price: Decimal,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image: String,
    },
    List {
        #[arg(long)]
        brand: Option<String>,
        #[arg(long = "type")]
        equipment_type: Option<EquipmentType>,
        #[arg(long)]
        all: bool,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = decimal_arg)]
        price: Option<Decimal>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct CreateQuoteArgs {
    #[arg(long)]
    pub customer: i64,
    #[arg(long)]
    pub advisor: Option<i64>,
    #[arg(long = "type", default_value = "implement")]
    pub template: EquipmentType,
    /// Line-item CSV file.
    #[arg(long)]
    pub items: Option<PathBuf>,
    /// Catalog line as `MODEL_ID[:QUANTITY]`, priced at the model's base
    /// price. Repeatable.
    #[arg(long = "model")]
    pub models: Vec<String>,
    /// Currency for catalog lines.
    #[arg(long, default_value = "CRC")]
    pub currency: Currency,
    /// Quote number; generated from the current time when omitted.
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub validity_days: Option<u32>,
    #[arg(long, default_value = "")]
    pub attention: String,
    #[arg(long, default_value = "")]
    pub terms: String,
    #[arg(long, default_value = "")]
    pub fiscal_note: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Subcommand)]
pub enum QuoteCommand {
    Create(CreateQuoteArgs),
    List {
        #[arg(long)]
        customer: Option<i64>,
        #[arg(long = "type")]
        template: Option<EquipmentType>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    Search {
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        product: Option<String>,
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
        #[arg(long)]
        advisor: Option<i64>,
        #[arg(long = "type")]
        template: Option<EquipmentType>,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Show a quote by id or number.
    Show {
        quote: String,
        /// Print the stored record and recomputed totals as JSON.
        #[arg(long)]
        json: bool,
    },
    Duplicate {
        id: i64,
        /// Defaults to the source number with a `-COPY` suffix.
        #[arg(long)]
        number: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: i64,
    },
    /// Render the fixed-width document.
    Render {
        id: i64,
        /// Write to this file and remember its path on the quote.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
    },
}
