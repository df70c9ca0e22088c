use std::io::Write;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use proforma_core::config::validate_char_limit;
use proforma_core::db::{DbConfig, RepositoryRegistry};
use proforma_core::document::{TotalsLine, format_money, format_percent, truncate_text};
use proforma_core::numbering::copy_number;
use proforma_core::validation::{validate_advisor, validate_customer, validate_email};
use proforma_core::{
    AdvisorUpdate, CustomerUpdate, EquipmentModelUpdate, LineTotals, ModelFilter, NewAdvisor,
    NewBrand, NewConfigEntry, NewCustomer, NewEquipmentModel, Proforma, ProformaDraft,
    ProformaListFilter, ProformaSearch, ProformaSummary, QuoteConfig, QuoteCurrency,
    QuoteRepository, QuoteService, QuoteTotals, RecordFilter, RepositoryError, TotalsEngine,
};
use proforma_db_sqlite::SqliteRepositoryFactory;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{
    BrandCommand, Cli, Command, ConfigCommand, CreateQuoteArgs, ModelCommand, PartyCommand,
    PartyFields, QuoteCommand, TotalsArgs,
};
use crate::{csv_loader, settings};

/// Builds the registry with every compiled-in backend.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Entry point behind `main`: loads settings, opens the store when the
/// command needs one and writes the command's output to `out`.
pub async fn run(
    cli: Cli,
    out: &mut impl Write,
) -> Result<()> {
    let config = settings::load(cli.config.as_deref())?;

    if let Command::Totals(args) = &cli.command {
        return run_totals(args, &config, out);
    }

    let db = DbConfig {
        backend: cli.backend.to_lowercase(),
        connection_string: cli.db.clone(),
    };
    let repo = build_registry()
        .create(&db)
        .await
        .with_context(|| format!("Failed to open {} database '{}'", db.backend, db.connection_string))?;
    info!(backend = %db.backend, "database ready");

    execute(cli.command, repo.as_ref(), config, out).await
}

#[derive(Debug, Serialize)]
struct TotalsReport<'a> {
    lines: &'a [LineTotals],
    totals: &'a QuoteTotals,
}

/// `proforma totals`: prices a line-item file without touching the store.
pub fn run_totals(
    args: &TotalsArgs,
    config: &QuoteConfig,
    out: &mut impl Write,
) -> Result<()> {
    let items = csv_loader::load_from_file(&args.items)
        .with_context(|| format!("Failed to load items: {}", args.items.display()))?;
    let engine = args
        .default_tax_rate
        .map(TotalsEngine::new)
        .unwrap_or_else(|| config.engine());

    let lines = items
        .iter()
        .map(|item| engine.line_totals(&item.to_line_item()))
        .collect::<Result<Vec<_>, _>>()?;
    let totals = engine.aggregate(&lines)?;
    debug!(lines = lines.len(), currencies = ?totals.currencies(), "computed totals");

    serde_json::to_writer_pretty(
        &mut *out,
        &TotalsReport {
            lines: &lines,
            totals: &totals,
        },
    )?;
    writeln!(out)?;
    Ok(())
}

/// Runs every command that needs the store.
pub async fn execute<R: QuoteRepository + ?Sized>(
    command: Command,
    repo: &R,
    config: QuoteConfig,
    out: &mut impl Write,
) -> Result<()> {
    let service = QuoteService::with_stored_config(repo, config).await?;

    match command {
        Command::Totals(args) => run_totals(&args, service.config(), out),
        Command::Customer(cmd) => customer(cmd, repo, out).await,
        Command::Advisor(cmd) => advisor(cmd, repo, out).await,
        Command::Brand(cmd) => brand(cmd, repo, out).await,
        Command::Model(cmd) => model(cmd, repo, out).await,
        Command::Quote(cmd) => quote(cmd, &service, repo, out).await,
        Command::Config(cmd) => configuration(cmd, &service, repo, out).await,
        Command::Stats => {
            let stats = repo.stats().await?;
            writeln!(out, "Customers:  {} ({} active)", stats.customers, stats.active_customers)?;
            writeln!(out, "Advisors:   {}", stats.advisors)?;
            writeln!(out, "Brands:     {}", stats.brands)?;
            writeln!(out, "Models:     {}", stats.models)?;
            writeln!(out, "Proformas:  {}", stats.proformas)?;
            Ok(())
        }
    }
}

fn not_found(
    what: &str,
    id: impl std::fmt::Display,
) -> impl FnOnce(RepositoryError) -> anyhow::Error {
    let label = format!("{what} {id}");
    move |e| match e {
        RepositoryError::NotFound => anyhow!("{label} not found"),
        other => anyhow::Error::new(other).context(format!("while loading {label}")),
    }
}

fn print_json(
    out: &mut impl Write,
    value: &impl Serialize,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

// ── customers and advisors ───────────────────────────────────────────────────

fn new_customer(fields: PartyFields) -> NewCustomer {
    NewCustomer {
        company: fields.company.unwrap_or_default(),
        email: fields.email.unwrap_or_default(),
        phone: fields.phone.unwrap_or_default(),
        address: fields.address.unwrap_or_default(),
        ..NewCustomer::named(fields.name.unwrap_or_default())
    }
    .trimmed()
}

async fn customer<R: QuoteRepository + ?Sized>(
    cmd: PartyCommand,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        PartyCommand::Add { fields } => {
            let new = new_customer(fields);
            validate_customer(&new)?;
            let created = repo.create_customer(new).await?;
            info!(id = created.id, "created customer");
            writeln!(out, "Created customer {}: {}", created.id, created.name)?;
        }
        PartyCommand::List { search, all } => {
            let filter = RecordFilter {
                search,
                active_only: !all,
            };
            for c in repo.list_customers(&filter).await? {
                writeln!(
                    out,
                    "{:>5}  {:<30}  {:<30}  {}",
                    c.id,
                    truncate_text(&c.name, 30),
                    truncate_text(&c.company, 30),
                    c.email
                )?;
            }
        }
        PartyCommand::Show { id } => {
            let c = repo.get_customer(id).await.map_err(not_found("customer", id))?;
            print_json(out, &c)?;
        }
        PartyCommand::Update { id, fields, active } => {
            if let Some(email) = &fields.email {
                validate_email(email)?;
            }
            let update = CustomerUpdate {
                name: fields.name,
                company: fields.company,
                email: fields.email,
                phone: fields.phone,
                address: fields.address,
                active,
            };
            let updated = repo
                .update_customer(id, &update)
                .await
                .map_err(not_found("customer", id))?;
            info!(id, "updated customer");
            writeln!(out, "Updated customer {}: {}", updated.id, updated.name)?;
        }
        PartyCommand::Delete { id } => {
            repo.delete_customer(id).await.map_err(not_found("customer", id))?;
            info!(id, "deleted customer");
            writeln!(out, "Deleted customer {id}")?;
        }
    }
    Ok(())
}

async fn advisor<R: QuoteRepository + ?Sized>(
    cmd: PartyCommand,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        PartyCommand::Add { fields } => {
            let new = NewAdvisor {
                email: fields.email.unwrap_or_default(),
                phone: fields.phone.unwrap_or_default(),
                ..NewAdvisor::named(fields.name.unwrap_or_default())
            }
            .trimmed();
            validate_advisor(&new)?;
            let created = repo.create_advisor(new).await?;
            info!(id = created.id, "created advisor");
            writeln!(out, "Created advisor {}: {}", created.id, created.name)?;
        }
        PartyCommand::List { search, all } => {
            let filter = RecordFilter {
                search,
                active_only: !all,
            };
            for a in repo.list_advisors(&filter).await? {
                writeln!(out, "{:>5}  {:<30}  {:<16}  {}", a.id, a.name, a.phone, a.email)?;
            }
        }
        PartyCommand::Show { id } => {
            let a = repo.get_advisor(id).await.map_err(not_found("advisor", id))?;
            print_json(out, &a)?;
        }
        PartyCommand::Update { id, fields, active } => {
            if let Some(email) = &fields.email {
                validate_email(email)?;
            }
            let update = AdvisorUpdate {
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                active,
            };
            let updated = repo
                .update_advisor(id, &update)
                .await
                .map_err(not_found("advisor", id))?;
            info!(id, "updated advisor");
            writeln!(out, "Updated advisor {}: {}", updated.id, updated.name)?;
        }
        PartyCommand::Delete { id } => {
            repo.delete_advisor(id).await.map_err(not_found("advisor", id))?;
            info!(id, "deleted advisor");
            writeln!(out, "Deleted advisor {id}")?;
        }
    }
    Ok(())
}

// ── catalog ──────────────────────────────────────────────────────────────────

async fn brand<R: QuoteRepository + ?Sized>(
    cmd: BrandCommand,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        BrandCommand::Add {
            name,
            equipment_type,
        } => {
            if name.trim().is_empty() {
                bail!("brand name is required");
            }
            let created = repo.create_brand(NewBrand::new(name, equipment_type)).await?;
            info!(id = created.id, "created brand");
            writeln!(out, "Created brand {}: {} ({})", created.id, created.name, created.equipment_type)?;
        }
        BrandCommand::List {
            equipment_type,
            all,
        } => {
            for b in repo.list_brands(equipment_type, !all).await? {
                writeln!(out, "{:>5}  {:<30}  {}", b.id, b.name, b.equipment_type)?;
            }
        }
        BrandCommand::Delete { id } => {
            repo.delete_brand(id).await.map_err(not_found("brand", id))?;
            info!(id, "deleted brand");
            writeln!(out, "Deleted brand {id} and its models")?;
        }
    }
    Ok(())
}

async fn model<R: QuoteRepository + ?Sized>(
    cmd: ModelCommand,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        ModelCommand::Add {
            brand,
            name,
            price,
            description,
            image,
        } => {
            if name.trim().is_empty() {
                bail!("model name is required");
            }
            if price.is_sign_negative() {
                bail!("price must not be negative");
            }
            let brand = repo
                .get_brand_by_name(&brand)
                .await
                .map_err(not_found("brand", &brand))?;
            let created = repo
                .create_model(NewEquipmentModel {
                    description,
                    image_path: image,
                    ..NewEquipmentModel::new(brand.id, name, price)
                })
                .await?;
            info!(id = created.id, "created model");
            writeln!(out, "Created model {}: {}", created.id, created.full_name())?;
        }
        ModelCommand::List {
            brand,
            equipment_type,
            all,
        } => {
            let brand_id = match brand {
                Some(name) => Some(
                    repo.get_brand_by_name(&name)
                        .await
                        .map_err(not_found("brand", &name))?
                        .id,
                ),
                None => None,
            };
            let filter = ModelFilter {
                brand_id,
                equipment_type,
                active_only: !all,
            };
            for m in repo.list_models(&filter).await? {
                writeln!(
                    out,
                    "{:>5}  {:<40}  {:>14}",
                    m.id,
                    truncate_text(&m.full_name(), 40),
                    m.base_price.round_dp(2)
                )?;
            }
        }
        ModelCommand::Update {
            id,
            name,
            price,
            description,
            image,
            active,
        } => {
            if price.is_some_and(|p| p.is_sign_negative()) {
                bail!("price must not be negative");
            }
            let update = EquipmentModelUpdate {
                name,
                description,
                base_price: price,
                image_path: image,
                active,
            };
            let updated = repo
                .update_model(id, &update)
                .await
                .map_err(not_found("model", id))?;
            info!(id, "updated model");
            writeln!(out, "Updated model {}: {} at {}", updated.id, updated.full_name(), updated.base_price)?;
        }
        ModelCommand::Delete { id } => {
            repo.delete_model(id).await.map_err(not_found("model", id))?;
            info!(id, "deleted model");
            writeln!(out, "Deleted model {id}")?;
        }
    }
    Ok(())
}

// ── quotes ───────────────────────────────────────────────────────────────────

/// Parses `MODEL_ID[:QUANTITY]`; quantity defaults to 1.
pub fn parse_catalog_line(spec: &str) -> Result<(i64, u32)> {
    let (id, quantity) = match spec.split_once(':') {
        Some((id, qty)) => (id, qty),
        None => (spec, "1"),
    };
    let id = id
        .trim()
        .parse()
        .with_context(|| format!("invalid model id in '{spec}'"))?;
    let quantity = quantity
        .trim()
        .parse()
        .with_context(|| format!("invalid quantity in '{spec}'"))?;
    Ok((id, quantity))
}

fn summary_total(summary: &ProformaSummary) -> String {
    match summary.currency {
        QuoteCurrency::Single(currency) => format_money(summary.total, currency),
        QuoteCurrency::Mixed => "MIXED".to_string(),
    }
}

fn print_summaries(
    out: &mut impl Write,
    summaries: &[ProformaSummary],
) -> Result<()> {
    for s in summaries {
        writeln!(
            out,
            "{:>5}  {:<22}  {}  {:<9}  {:<28}  {:>18}  {} item(s)",
            s.id,
            s.number,
            s.date.format("%Y-%m-%d"),
            s.template.as_str(),
            truncate_text(&s.customer_name, 28),
            summary_total(s),
            s.item_count
        )?;
    }
    Ok(())
}

fn print_totals_lines(
    out: &mut impl Write,
    lines: &[TotalsLine],
) -> Result<()> {
    for line in lines {
        match line {
            TotalsLine::Heading(currency) => writeln!(out, "  [{currency}]")?,
            TotalsLine::Amount { label, value } | TotalsLine::Total { label, value } => {
                writeln!(out, "  {label:<16}{value:>20}")?
            }
        }
    }
    Ok(())
}

async fn find_proforma<R: QuoteRepository + ?Sized>(
    repo: &R,
    key: &str,
) -> Result<Proforma> {
    let result = match key.trim().parse::<i64>() {
        Ok(id) => repo.get_proforma(id).await,
        Err(_) => repo.get_proforma_by_number(key).await,
    };
    result.map_err(not_found("proforma", key))
}

async fn create_quote<R: QuoteRepository + ?Sized>(
    args: CreateQuoteArgs,
    service: &QuoteService<'_, R>,
    out: &mut impl Write,
) -> Result<()> {
    let now = Local::now();
    let number = args
        .number
        .unwrap_or_else(|| service.next_number(now.naive_local()));
    let mut draft = ProformaDraft::new(
        number,
        args.customer,
        args.template,
        args.date.unwrap_or_else(|| now.date_naive()),
    );
    draft.advisor_id = args.advisor;
    draft.validity_days = args
        .validity_days
        .unwrap_or(service.config().default_validity_days);
    draft.customer_attention = args.attention;
    draft.custom_terms = args.terms;
    draft.custom_fiscal_note = args.fiscal_note;
    draft.notes = args.notes;

    if let Some(path) = &args.items {
        draft.items = csv_loader::load_from_file(path)
            .with_context(|| format!("Failed to load items: {}", path.display()))?;
    }
    for spec in &args.models {
        let (model_id, quantity) = parse_catalog_line(spec)?;
        let item = service
            .priced_item_from_catalog(model_id, quantity, args.currency)
            .await
            .with_context(|| format!("catalog model {model_id}"))?;
        draft.items.push(item);
    }

    let stored = service.create_proforma(draft).await?;
    writeln!(
        out,
        "Created proforma {} (id {}) with {} item(s)",
        stored.number,
        stored.id,
        stored.items.len()
    )?;
    let document = service.build_document(&stored).await?;
    print_totals_lines(out, &document.totals_lines())
}

async fn show_quote<R: QuoteRepository + ?Sized>(
    key: &str,
    json: bool,
    service: &QuoteService<'_, R>,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    let proforma = find_proforma(repo, key).await?;

    if json {
        #[derive(Serialize)]
        struct Shown<'a> {
            proforma: &'a Proforma,
            totals: QuoteTotals,
        }
        let totals = service.quote_totals(&proforma)?;
        return print_json(
            out,
            &Shown {
                proforma: &proforma,
                totals,
            },
        );
    }

    let document = service.build_document(&proforma).await?;
    let customer = document.pages.first().and_then(|p| p.customer.as_ref());
    writeln!(out, "{}  {}", proforma.number, document.header.title)?;
    writeln!(
        out,
        "Date: {}  Valid until: {} ({} days)",
        proforma.date,
        proforma.valid_until(),
        proforma.validity_days
    )?;
    if let Some(c) = customer {
        writeln!(out, "Customer: {} {}", c.name, c.company)?;
    }
    if let Some(a) = &document.footer.advisor {
        writeln!(out, "Advisor: {}", a.name)?;
    }
    for item in &proforma.items {
        writeln!(
            out,
            "  {:>3} x {:<36} {:>16}  -{:<6} IVA {:<6} {:>18}",
            item.quantity,
            truncate_text(&item.full_name(), 36),
            format_money(item.unit_price, item.currency),
            format_percent(item.discount_percent),
            format_percent(item.tax_rate),
            format_money(item.line_total, item.currency)
        )?;
    }
    print_totals_lines(out, &document.totals_lines())
}

async fn quote<R: QuoteRepository + ?Sized>(
    cmd: QuoteCommand,
    service: &QuoteService<'_, R>,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        QuoteCommand::Create(args) => create_quote(args, service, out).await?,
        QuoteCommand::List {
            customer,
            template,
            limit,
            offset,
        } => {
            let filter = ProformaListFilter {
                customer_id: customer,
                template,
                limit,
                offset,
            };
            print_summaries(out, &repo.list_proformas(&filter).await?)?;
        }
        QuoteCommand::Search {
            number,
            customer,
            product,
            from,
            to,
            advisor,
            template,
            limit,
        } => {
            let search = ProformaSearch {
                number,
                customer,
                product,
                date_from: from,
                date_to: to,
                advisor_id: advisor,
                template,
                limit,
            };
            print_summaries(out, &repo.search_proformas(&search).await?)?;
        }
        QuoteCommand::Show { quote, json } => show_quote(&quote, json, service, repo, out).await?,
        QuoteCommand::Duplicate { id, number, date } => {
            let source = repo.get_proforma(id).await.map_err(not_found("proforma", id))?;
            let number = number.unwrap_or_else(|| copy_number(&source.number));
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let copy = service.duplicate_proforma(id, &number, date).await?;
            writeln!(out, "Created proforma {} (id {}) from {}", copy.number, copy.id, source.number)?;
        }
        QuoteCommand::Delete { id } => {
            repo.delete_proforma(id).await.map_err(not_found("proforma", id))?;
            info!(id, "deleted proforma");
            writeln!(out, "Deleted proforma {id}")?;
        }
        QuoteCommand::Render { id, output } => {
            let proforma = repo.get_proforma(id).await.map_err(not_found("proforma", id))?;
            let text = service.build_document(&proforma).await?.render_text();
            match output {
                Some(path) => {
                    std::fs::write(&path, &text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    let path = path.display().to_string();
                    repo.set_document_path(id, &path).await?;
                    info!(id, path = %path, "rendered proforma");
                    writeln!(out, "Wrote {path}")?;
                }
                None => write!(out, "{text}")?,
            }
        }
    }
    Ok(())
}

// ── configuration ────────────────────────────────────────────────────────────

async fn configuration<R: QuoteRepository + ?Sized>(
    cmd: ConfigCommand,
    service: &QuoteService<'_, R>,
    repo: &R,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        ConfigCommand::Get { key } => {
            let value = service
                .config()
                .get(&key)
                .ok_or_else(|| anyhow!("unknown configuration key '{key}'"))?;
            writeln!(out, "{value}")?;
        }
        ConfigCommand::Set { key, value } => {
            if service.config().get(&key).is_none() {
                bail!("unknown configuration key '{key}'");
            }
            validate_char_limit(&key, &value)?;
            match key.as_str() {
                "default_tax_rate" => {
                    value
                        .trim()
                        .parse::<rust_decimal::Decimal>()
                        .with_context(|| format!("invalid tax rate '{value}'"))?;
                }
                "default_validity_days" => {
                    value
                        .trim()
                        .parse::<u32>()
                        .with_context(|| format!("invalid validity '{value}'"))?;
                }
                _ => {}
            }
            let entry = match service.config().entries().into_iter().find(|e| e.key == key) {
                Some(known) => NewConfigEntry { value, ..known },
                None => NewConfigEntry::new(key, value),
            };
            let stored = repo.set_config(entry).await?;
            info!(key = %stored.key, "stored configuration");
            writeln!(out, "{} = {}", stored.key, truncate_text(&stored.value, 60))?;
        }
        ConfigCommand::List { category } => {
            for e in repo.list_config(category.as_deref()).await? {
                writeln!(
                    out,
                    "{:<10}  {:<22}  {}",
                    e.category,
                    e.key,
                    truncate_text(&e.value.replace('\n', " "), 60)
                )?;
            }
        }
    }
    Ok(())
}
