use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proforma_core::{
    Advisor, AdvisorUpdate, Brand, ConfigEntry, Currency, Customer, CustomerUpdate,
    EquipmentModel, EquipmentModelUpdate, EquipmentType, ModelFilter, NewAdvisor, NewBrand,
    NewConfigEntry, NewCustomer, NewEquipmentModel, NewProforma, Proforma, ProformaItem,
    ProformaListFilter, ProformaSearch, ProformaStats, ProformaSummary, QuoteCurrency,
    QuoteRepository, RecordFilter, RepositoryError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url` (`sqlite:path` or `sqlite::memory:`),
    /// creating the file if needed.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_items(
        &self,
        proforma_id: i64,
    ) -> Result<Vec<ProformaItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM proforma_item WHERE proforma_id = ? ORDER BY position, id"
        ))
        .bind(proforma_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn fetch_proforma(
        &self,
        row: Option<SqliteRow>,
    ) -> Result<Proforma, RepositoryError> {
        let row = row.ok_or(RepositoryError::NotFound)?;
        let mut proforma = row_to_proforma(&row)?;
        proforma.items = self.load_items(proforma.id).await?;
        Ok(proforma)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// row mapping
// ─────────────────────────────────────────────────────────────────────────────

const CUSTOMER_COLUMNS: &str =
    "id, name, company, email, phone, address, active, created_at, updated_at";
const ADVISOR_COLUMNS: &str = "id, name, email, phone, active, created_at, updated_at";
const BRAND_COLUMNS: &str = "id, name, equipment_type, active, created_at, updated_at";
const MODEL_SELECT: &str = "SELECT m.id, m.brand_id, b.name AS brand_name, m.name, m.description,
        m.base_price, m.image_path, m.active, m.created_at, m.updated_at
     FROM equipment_model m
     JOIN brand b ON b.id = m.brand_id";
const CONFIG_COLUMNS: &str = "key, value, category, description, updated_at";
const PROFORMA_COLUMNS: &str = "id, number, customer_id, advisor_id, customer_attention, template,
        validity_days, date, currency, subtotal, discount, net_subtotal, tax, total,
        custom_terms, custom_fiscal_note, notes, document_path, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, proforma_id, model_id, brand_name, model_name, year, description,
        image_path, quantity, unit_price, discount_percent, discount_amount, line_subtotal,
        tax_rate, line_tax, line_total, currency";
const SUMMARY_SELECT: &str = "SELECT p.id, p.number, p.date, p.template, p.currency, p.total,
        p.created_at, c.name AS customer_name, c.company AS customer_company,
        a.name AS advisor_name,
        (SELECT COUNT(*) FROM proforma_item i WHERE i.proforma_id = p.id) AS item_count
     FROM proforma p
     JOIN customer c ON c.id = p.customer_id
     LEFT JOIN advisor a ON a.id = p.advisor_id
     WHERE 1 = 1";

/// Maps sqlx errors, turning UNIQUE violations into
/// [`RepositoryError::Duplicate`].
fn db_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let field = db
                .message()
                .split("UNIQUE constraint failed: ")
                .nth(1)
                .unwrap_or("unknown")
                .to_string();
            RepositoryError::Duplicate(field)
        }
        other => RepositoryError::Database(other.to_string()),
    }
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn get_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    get::<DateTime<Utc>>(row, column)
}

fn get_equipment_type(
    row: &SqliteRow,
    column: &str,
) -> Result<EquipmentType, RepositoryError> {
    let value: String = get(row, column)?;
    EquipmentType::parse(&value).ok_or_else(|| {
        RepositoryError::Database(format!("Unknown equipment type '{}' in '{}'", value, column))
    })
}

fn get_currency(
    row: &SqliteRow,
    column: &str,
) -> Result<Currency, RepositoryError> {
    let value: String = get(row, column)?;
    Currency::parse(&value).ok_or_else(|| {
        RepositoryError::Database(format!("Unknown currency '{}' in '{}'", value, column))
    })
}

fn get_quote_currency(
    row: &SqliteRow,
    column: &str,
) -> Result<QuoteCurrency, RepositoryError> {
    let value: String = get(row, column)?;
    QuoteCurrency::parse(&value).ok_or_else(|| {
        RepositoryError::Database(format!("Unknown currency '{}' in '{}'", value, column))
    })
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: get(row, "id")?,
        name: get(row, "name")?,
        company: get(row, "company")?,
        email: get(row, "email")?,
        phone: get(row, "phone")?,
        address: get(row, "address")?,
        active: get(row, "active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_advisor(row: &SqliteRow) -> Result<Advisor, RepositoryError> {
    Ok(Advisor {
        id: get(row, "id")?,
        name: get(row, "name")?,
        email: get(row, "email")?,
        phone: get(row, "phone")?,
        active: get(row, "active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_brand(row: &SqliteRow) -> Result<Brand, RepositoryError> {
    Ok(Brand {
        id: get(row, "id")?,
        name: get(row, "name")?,
        equipment_type: get_equipment_type(row, "equipment_type")?,
        active: get(row, "active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_model(row: &SqliteRow) -> Result<EquipmentModel, RepositoryError> {
    Ok(EquipmentModel {
        id: get(row, "id")?,
        brand_id: get(row, "brand_id")?,
        brand_name: get(row, "brand_name")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        base_price: get_decimal(row, "base_price")?,
        image_path: get(row, "image_path")?,
        active: get(row, "active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_config(row: &SqliteRow) -> Result<ConfigEntry, RepositoryError> {
    Ok(ConfigEntry {
        key: get(row, "key")?,
        value: get(row, "value")?,
        category: get(row, "category")?,
        description: get(row, "description")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

/// Header only; items are loaded separately.
fn row_to_proforma(row: &SqliteRow) -> Result<Proforma, RepositoryError> {
    Ok(Proforma {
        id: get(row, "id")?,
        number: get(row, "number")?,
        customer_id: get(row, "customer_id")?,
        advisor_id: get(row, "advisor_id")?,
        customer_attention: get(row, "customer_attention")?,
        template: get_equipment_type(row, "template")?,
        validity_days: get(row, "validity_days")?,
        date: get(row, "date")?,
        currency: get_quote_currency(row, "currency")?,
        subtotal: get_decimal(row, "subtotal")?,
        discount: get_decimal(row, "discount")?,
        net_subtotal: get_decimal(row, "net_subtotal")?,
        tax: get_decimal(row, "tax")?,
        total: get_decimal(row, "total")?,
        custom_terms: get(row, "custom_terms")?,
        custom_fiscal_note: get(row, "custom_fiscal_note")?,
        notes: get(row, "notes")?,
        document_path: get(row, "document_path")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
        items: Vec::new(),
    })
}

fn row_to_item(row: &SqliteRow) -> Result<ProformaItem, RepositoryError> {
    Ok(ProformaItem {
        id: get(row, "id")?,
        proforma_id: get(row, "proforma_id")?,
        model_id: get(row, "model_id")?,
        brand_name: get(row, "brand_name")?,
        model_name: get(row, "model_name")?,
        year: get(row, "year")?,
        description: get(row, "description")?,
        image_path: get(row, "image_path")?,
        quantity: get(row, "quantity")?,
        unit_price: get_decimal(row, "unit_price")?,
        discount_percent: get_decimal(row, "discount_percent")?,
        discount_amount: get_decimal(row, "discount_amount")?,
        line_subtotal: get_decimal(row, "line_subtotal")?,
        tax_rate: get_decimal(row, "tax_rate")?,
        line_tax: get_decimal(row, "line_tax")?,
        line_total: get_decimal(row, "line_total")?,
        currency: get_currency(row, "currency")?,
    })
}

fn row_to_summary(row: &SqliteRow) -> Result<ProformaSummary, RepositoryError> {
    Ok(ProformaSummary {
        id: get(row, "id")?,
        number: get(row, "number")?,
        date: get(row, "date")?,
        template: get_equipment_type(row, "template")?,
        currency: get_quote_currency(row, "currency")?,
        total: get_decimal(row, "total")?,
        customer_name: get(row, "customer_name")?,
        customer_company: get(row, "customer_company")?,
        advisor_name: get(row, "advisor_name")?,
        item_count: get(row, "item_count")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn like(term: &str) -> String {
    format!("%{}%", term)
}

fn ensure_affected(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl QuoteRepository for SqliteRepository {
    // ── customers ────────────────────────────────────────────────────────

    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<Customer, RepositoryError> {
        let customer = customer.trimmed();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO customer (name, company, email, phone, address, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.name)
        .bind(&customer.company)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_customer(result.last_insert_rowid()).await
    }

    async fn get_customer(
        &self,
        id: i64,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_customer(&row)
    }

    async fn update_customer(
        &self,
        id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let mut customer = self.get_customer(id).await?;
        update.apply(&mut customer);

        let result = sqlx::query(
            "UPDATE customer SET name = ?, company = ?, email = ?, phone = ?, address = ?,
                    active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&customer.name)
        .bind(&customer.company)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        ensure_affected(result.rows_affected())?;

        self.get_customer(id).await
    }

    async fn delete_customer(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    async fn list_customers(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE 1 = 1"
        ));
        if filter.active_only {
            qb.push(" AND active = 1");
        }
        if let Some(term) = filter.term() {
            let pattern = like(term);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR company LIKE ")
                .push_bind(pattern.clone())
                .push(" OR email LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY name COLLATE NOCASE, id");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_customer).collect()
    }

    // ── advisors ─────────────────────────────────────────────────────────

    async fn create_advisor(
        &self,
        advisor: NewAdvisor,
    ) -> Result<Advisor, RepositoryError> {
        let advisor = advisor.trimmed();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO advisor (name, email, phone, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&advisor.name)
        .bind(&advisor.email)
        .bind(&advisor.phone)
        .bind(advisor.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_advisor(result.last_insert_rowid()).await
    }

    async fn get_advisor(
        &self,
        id: i64,
    ) -> Result<Advisor, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ADVISOR_COLUMNS} FROM advisor WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_advisor(&row)
    }

    async fn update_advisor(
        &self,
        id: i64,
        update: &AdvisorUpdate,
    ) -> Result<Advisor, RepositoryError> {
        let mut advisor = self.get_advisor(id).await?;
        update.apply(&mut advisor);

        let result = sqlx::query(
            "UPDATE advisor SET name = ?, email = ?, phone = ?, active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&advisor.name)
        .bind(&advisor.email)
        .bind(&advisor.phone)
        .bind(advisor.active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        ensure_affected(result.rows_affected())?;

        self.get_advisor(id).await
    }

    async fn delete_advisor(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM advisor WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    async fn list_advisors(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<Advisor>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ADVISOR_COLUMNS} FROM advisor WHERE 1 = 1"
        ));
        if filter.active_only {
            qb.push(" AND active = 1");
        }
        if let Some(term) = filter.term() {
            let pattern = like(term);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR email LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY name COLLATE NOCASE, id");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_advisor).collect()
    }

    // ── brands ───────────────────────────────────────────────────────────

    async fn create_brand(
        &self,
        brand: NewBrand,
    ) -> Result<Brand, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO brand (name, equipment_type, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(brand.name.trim())
        .bind(brand.equipment_type.as_str())
        .bind(brand.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_brand(result.last_insert_rowid()).await
    }

    async fn get_brand(
        &self,
        id: i64,
    ) -> Result<Brand, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BRAND_COLUMNS} FROM brand WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_brand(&row)
    }

    async fn get_brand_by_name(
        &self,
        name: &str,
    ) -> Result<Brand, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BRAND_COLUMNS} FROM brand WHERE name = ? COLLATE NOCASE"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_brand(&row)
    }

    async fn list_brands(
        &self,
        equipment_type: Option<EquipmentType>,
        active_only: bool,
    ) -> Result<Vec<Brand>, RepositoryError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {BRAND_COLUMNS} FROM brand WHERE 1 = 1"));
        if let Some(equipment_type) = equipment_type {
            qb.push(" AND equipment_type = ")
                .push_bind(equipment_type.as_str());
        }
        if active_only {
            qb.push(" AND active = 1");
        }
        qb.push(" ORDER BY name COLLATE NOCASE");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_brand).collect()
    }

    async fn delete_brand(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM brand WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    // ── equipment models ─────────────────────────────────────────────────

    async fn create_model(
        &self,
        model: NewEquipmentModel,
    ) -> Result<EquipmentModel, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO equipment_model (brand_id, name, description, base_price, image_path,
                    active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(model.brand_id)
        .bind(model.name.trim())
        .bind(model.description.trim())
        .bind(decimal_to_text(model.base_price))
        .bind(model.image_path.trim())
        .bind(model.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_model(result.last_insert_rowid()).await
    }

    async fn get_model(
        &self,
        id: i64,
    ) -> Result<EquipmentModel, RepositoryError> {
        let row = sqlx::query(&format!("{MODEL_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_model(&row)
    }

    async fn get_model_by_name(
        &self,
        brand_id: i64,
        name: &str,
    ) -> Result<EquipmentModel, RepositoryError> {
        let row = sqlx::query(&format!(
            "{MODEL_SELECT} WHERE m.brand_id = ? AND m.name = ? COLLATE NOCASE"
        ))
        .bind(brand_id)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_model(&row)
    }

    async fn update_model(
        &self,
        id: i64,
        update: &EquipmentModelUpdate,
    ) -> Result<EquipmentModel, RepositoryError> {
        let mut model = self.get_model(id).await?;
        update.apply(&mut model);

        let result = sqlx::query(
            "UPDATE equipment_model SET name = ?, description = ?, base_price = ?,
                    image_path = ?, active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&model.name)
        .bind(&model.description)
        .bind(decimal_to_text(model.base_price))
        .bind(&model.image_path)
        .bind(model.active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        ensure_affected(result.rows_affected())?;

        self.get_model(id).await
    }

    async fn delete_model(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM equipment_model WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    async fn list_models(
        &self,
        filter: &ModelFilter,
    ) -> Result<Vec<EquipmentModel>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("{MODEL_SELECT} WHERE 1 = 1"));
        if let Some(brand_id) = filter.brand_id {
            qb.push(" AND m.brand_id = ").push_bind(brand_id);
        }
        if let Some(equipment_type) = filter.equipment_type {
            qb.push(" AND b.equipment_type = ")
                .push_bind(equipment_type.as_str());
        }
        if filter.active_only {
            qb.push(" AND m.active = 1");
        }
        qb.push(" ORDER BY b.name COLLATE NOCASE, m.name COLLATE NOCASE");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_model).collect()
    }

    // ── configuration ────────────────────────────────────────────────────

    async fn get_config(
        &self,
        key: &str,
    ) -> Result<ConfigEntry, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONFIG_COLUMNS} FROM configuration WHERE key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_config(&row)
    }

    async fn set_config(
        &self,
        entry: NewConfigEntry,
    ) -> Result<ConfigEntry, RepositoryError> {
        sqlx::query(
            "INSERT INTO configuration (key, value, category, description, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                category = excluded.category,
                description = CASE WHEN excluded.description = ''
                                   THEN configuration.description
                                   ELSE excluded.description END,
                updated_at = excluded.updated_at",
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(&entry.category)
        .bind(&entry.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        info!(key = %entry.key, "configuration updated");
        self.get_config(&entry.key).await
    }

    async fn list_config(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ConfigEntry>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(&format!(
                    "SELECT {CONFIG_COLUMNS} FROM configuration WHERE category = ? ORDER BY key"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CONFIG_COLUMNS} FROM configuration ORDER BY category, key"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_error)?;

        rows.iter().map(row_to_config).collect()
    }

    // ── proformas ────────────────────────────────────────────────────────

    async fn create_proforma(
        &self,
        proforma: NewProforma,
    ) -> Result<Proforma, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            "INSERT INTO proforma (number, customer_id, advisor_id, customer_attention, template,
                    validity_days, date, currency, subtotal, discount, net_subtotal, tax, total,
                    custom_terms, custom_fiscal_note, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&proforma.number)
        .bind(proforma.customer_id)
        .bind(proforma.advisor_id)
        .bind(&proforma.customer_attention)
        .bind(proforma.template.as_str())
        .bind(proforma.validity_days)
        .bind(proforma.date)
        .bind(proforma.currency.as_str())
        .bind(decimal_to_text(proforma.subtotal))
        .bind(decimal_to_text(proforma.discount))
        .bind(decimal_to_text(proforma.net_subtotal))
        .bind(decimal_to_text(proforma.tax))
        .bind(decimal_to_text(proforma.total))
        .bind(&proforma.custom_terms)
        .bind(&proforma.custom_fiscal_note)
        .bind(&proforma.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let id = result.last_insert_rowid();

        for (position, priced) in proforma.items.iter().enumerate() {
            let item = &priced.item;
            let totals = &priced.totals;
            sqlx::query(
                "INSERT INTO proforma_item (proforma_id, position, model_id, brand_name,
                        model_name, year, description, image_path, quantity, unit_price,
                        discount_percent, discount_amount, line_subtotal, tax_rate, line_tax,
                        line_total, currency)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(item.model_id)
            .bind(item.brand_name.trim())
            .bind(item.model_name.trim())
            .bind(item.year)
            .bind(&item.description)
            .bind(&item.image_path)
            .bind(item.quantity)
            .bind(decimal_to_text(item.unit_price))
            .bind(decimal_to_text(item.discount_percent))
            .bind(decimal_to_text(totals.discount_amount))
            .bind(decimal_to_text(totals.line_subtotal))
            .bind(decimal_to_text(totals.tax_rate))
            .bind(decimal_to_text(totals.line_tax))
            .bind(decimal_to_text(totals.line_total))
            .bind(totals.currency.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        debug!(id, number = %proforma.number, items = proforma.items.len(), "inserted proforma");
        self.get_proforma(id).await
    }

    async fn get_proforma(
        &self,
        id: i64,
    ) -> Result<Proforma, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PROFORMA_COLUMNS} FROM proforma WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        self.fetch_proforma(row).await
    }

    async fn get_proforma_by_number(
        &self,
        number: &str,
    ) -> Result<Proforma, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PROFORMA_COLUMNS} FROM proforma WHERE number = ?"
        ))
        .bind(number.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        self.fetch_proforma(row).await
    }

    async fn list_proformas(
        &self,
        filter: &ProformaListFilter,
    ) -> Result<Vec<ProformaSummary>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND p.customer_id = ").push_bind(customer_id);
        }
        if let Some(template) = filter.template {
            qb.push(" AND p.template = ").push_bind(template.as_str());
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn search_proformas(
        &self,
        search: &ProformaSearch,
    ) -> Result<Vec<ProformaSummary>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
        if let Some(number) = search.number_term() {
            qb.push(" AND p.number LIKE ").push_bind(like(number));
        }
        if let Some(customer) = search.customer_term() {
            let pattern = like(customer);
            qb.push(" AND (c.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.company LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(product) = search.product_term() {
            let pattern = like(product);
            qb.push(
                " AND EXISTS (SELECT 1 FROM proforma_item i WHERE i.proforma_id = p.id AND (i.model_name LIKE ",
            )
            .push_bind(pattern.clone())
            .push(" OR i.brand_name LIKE ")
            .push_bind(pattern)
            .push("))");
        }
        if let Some(from) = search.date_from {
            qb.push(" AND p.date >= ").push_bind(from);
        }
        // Dates are stored without a time part, so <= covers the whole day.
        if let Some(to) = search.date_to {
            qb.push(" AND p.date <= ").push_bind(to);
        }
        if let Some(advisor_id) = search.advisor_id {
            qb.push(" AND p.advisor_id = ").push_bind(advisor_id);
        }
        if let Some(template) = search.template {
            qb.push(" AND p.template = ").push_bind(template.as_str());
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(search.limit);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn set_document_path(
        &self,
        id: i64,
        path: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE proforma SET document_path = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    async fn delete_proforma(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM proforma WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        ensure_affected(result.rows_affected())
    }

    async fn stats(&self) -> Result<ProformaStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM customer) AS customers,
                (SELECT COUNT(*) FROM customer WHERE active = 1) AS active_customers,
                (SELECT COUNT(*) FROM advisor) AS advisors,
                (SELECT COUNT(*) FROM brand) AS brands,
                (SELECT COUNT(*) FROM equipment_model) AS models,
                (SELECT COUNT(*) FROM proforma) AS proformas",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(ProformaStats {
            customers: get(&row, "customers")?,
            active_customers: get(&row, "active_customers")?,
            advisors: get(&row, "advisors")?,
            brands: get(&row, "brands")?,
            models: get(&row, "models")?,
            proformas: get(&row, "proformas")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proforma_core::service::price_draft;
    use proforma_core::{NewProformaItem, ProformaDraft, TotalsEngine};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool);
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn seeds_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).expect("valid date")
    }

    async fn customer(
        repo: &SqliteRepository,
        name: &str,
    ) -> Customer {
        repo.create_customer(NewCustomer::named(name))
            .await
            .expect("Failed to create customer")
    }

    async fn catalog(repo: &SqliteRepository) -> (Brand, EquipmentModel) {
        let brand = repo
            .create_brand(NewBrand::new("John Deere", EquipmentType::Tractor))
            .await
            .expect("Failed to create brand");
        let model = repo
            .create_model(NewEquipmentModel::new(brand.id, "5075E", dec!(32000)))
            .await
            .expect("Failed to create model");
        (brand, model)
    }

    async fn store(
        repo: &SqliteRepository,
        draft: ProformaDraft,
    ) -> Result<Proforma, RepositoryError> {
        let (record, _) = price_draft(&TotalsEngine::default(), draft).expect("valid draft");
        repo.create_proforma(record).await
    }

    fn draft(
        number: &str,
        customer_id: i64,
        date: NaiveDate,
    ) -> ProformaDraft {
        ProformaDraft::new(number, customer_id, EquipmentType::Tractor, date)
            .with_item(NewProformaItem::new("John Deere", "5075E", 1, dec!(1000), Currency::Crc))
            .with_item(
                NewProformaItem::new("Kuhn", "BD-300", 2, dec!(500), Currency::Crc)
                    .with_discount(dec!(10)),
            )
    }

    // ── customers ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_customer_trims_fields() {
        let repo = setup_test_db().await;
        let new = NewCustomer {
            name: "  Finca La Esperanza ".to_string(),
            email: " compras@esperanza.cr ".to_string(),
            ..NewCustomer::named("")
        };

        let created = repo.create_customer(new).await.unwrap();

        assert_eq!(created.name, "Finca La Esperanza");
        assert_eq!(created.email, "compras@esperanza.cr");
        assert!(created.active);
        assert_eq!(repo.get_customer(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_customer_is_partial() {
        let repo = setup_test_db().await;
        let created = customer(&repo, "Hacienda Santa Rosa").await;

        let updated = repo
            .update_customer(
                created.id,
                &CustomerUpdate {
                    phone: Some(" 2710-1111 ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Hacienda Santa Rosa");
        assert_eq!(updated.phone, "2710-1111");
    }

    #[tokio::test]
    async fn test_missing_customer_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_customer(42).await, Err(RepositoryError::NotFound));
        assert_eq!(repo.delete_customer(42).await, Err(RepositoryError::NotFound));
        assert_eq!(
            repo.update_customer(42, &CustomerUpdate::default()).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_list_customers_filters_and_orders() {
        let repo = setup_test_db().await;
        customer(&repo, "Zeta Agro").await;
        let inactive = customer(&repo, "Beta Cultivos").await;
        repo.update_customer(
            inactive.id,
            &CustomerUpdate {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.create_customer(NewCustomer {
            company: "Agro Pococí".to_string(),
            ..NewCustomer::named("alfa")
        })
        .await
        .unwrap();

        let active: Vec<_> = repo
            .list_customers(&RecordFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(active, vec!["alfa", "Zeta Agro"]);

        let all = repo.list_customers(&RecordFilter::all()).await.unwrap();
        assert_eq!(all.len(), 3);

        let found = repo
            .list_customers(&RecordFilter::search("AGRO"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    // ── advisors ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_advisor_crud() {
        let repo = setup_test_db().await;
        let created = repo
            .create_advisor(NewAdvisor {
                email: "ana@colono.cr".to_string(),
                ..NewAdvisor::named("Ana Solís")
            })
            .await
            .unwrap();

        let found = repo
            .list_advisors(&RecordFilter::search("colono"))
            .await
            .unwrap();
        assert_eq!(found, vec![created.clone()]);

        let updated = repo
            .update_advisor(
                created.id,
                &AdvisorUpdate {
                    phone: Some("8800-0000".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "8800-0000");

        repo.delete_advisor(created.id).await.unwrap();
        assert_eq!(repo.get_advisor(created.id).await, Err(RepositoryError::NotFound));
    }

    // ── catalog ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_brand_name_is_unique() {
        let repo = setup_test_db().await;
        catalog(&repo).await;

        let result = repo
            .create_brand(NewBrand::new("John Deere", EquipmentType::Implement))
            .await;

        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_model_name_is_unique_per_brand() {
        let repo = setup_test_db().await;
        let (brand, _) = catalog(&repo).await;
        let other = repo
            .create_brand(NewBrand::new("Kubota", EquipmentType::Tractor))
            .await
            .unwrap();

        let duplicate = repo
            .create_model(NewEquipmentModel::new(brand.id, "5075E", dec!(1)))
            .await;
        let same_name_other_brand = repo
            .create_model(NewEquipmentModel::new(other.id, "5075E", dec!(1)))
            .await;

        assert!(matches!(duplicate, Err(RepositoryError::Duplicate(_))));
        assert!(same_name_other_brand.is_ok());
    }

    #[tokio::test]
    async fn test_model_lookup_returns_brand_name_and_exact_price() {
        let repo = setup_test_db().await;
        let (brand, model) = catalog(&repo).await;

        let by_name = repo.get_model_by_name(brand.id, "5075e").await.unwrap();

        assert_eq!(by_name.id, model.id);
        assert_eq!(by_name.brand_name, "John Deere");
        assert_eq!(by_name.base_price, dec!(32000));
        assert_eq!(by_name.full_name(), "John Deere 5075E");
        assert_eq!(repo.get_brand_by_name("john deere").await.unwrap(), brand);
    }

    #[tokio::test]
    async fn test_list_models_orders_by_brand_then_model() {
        let repo = setup_test_db().await;
        let (deere, _) = catalog(&repo).await;
        let kuhn = repo
            .create_brand(NewBrand::new("Kuhn", EquipmentType::Implement))
            .await
            .unwrap();
        repo.create_model(NewEquipmentModel::new(kuhn.id, "BD-300", dec!(4500)))
            .await
            .unwrap();
        repo.create_model(NewEquipmentModel::new(deere.id, "5055E", dec!(28000)))
            .await
            .unwrap();

        let names: Vec<_> = repo
            .list_models(&ModelFilter::default())
            .await
            .unwrap()
            .iter()
            .map(EquipmentModel::full_name)
            .collect();
        assert_eq!(names, vec!["John Deere 5055E", "John Deere 5075E", "Kuhn BD-300"]);

        let implements = repo
            .list_models(&ModelFilter {
                equipment_type: Some(EquipmentType::Implement),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(implements.len(), 1);
        assert_eq!(implements[0].name, "BD-300");
    }

    #[tokio::test]
    async fn test_delete_brand_cascades_to_models() {
        let repo = setup_test_db().await;
        let (brand, model) = catalog(&repo).await;

        repo.delete_brand(brand.id).await.unwrap();

        assert_eq!(repo.get_model(model.id).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_update_model_price() {
        let repo = setup_test_db().await;
        let (_, model) = catalog(&repo).await;

        let updated = repo
            .update_model(
                model.id,
                &EquipmentModelUpdate {
                    base_price: Some(dec!(33500.50)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.base_price, dec!(33500.50));
        assert_eq!(updated.name, "5075E");
    }

    // ── configuration ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_seeds_load_default_configuration() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds_dir()).await.unwrap();

        let company = repo.list_config(Some("company")).await.unwrap();
        let name = repo.get_config("company_name").await.unwrap();

        assert_eq!(company.len(), 5);
        assert_eq!(name.value, "Colono");
        assert_eq!(name.description, "Nombre de la empresa");
        assert_eq!(repo.list_config(None).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_seeds_do_not_overwrite_values() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds_dir()).await.unwrap();
        repo.set_config(NewConfigEntry {
            category: "company".to_string(),
            ..NewConfigEntry::new("company_name", "Agro Norte")
        })
        .await
        .unwrap();

        repo.run_seeds(&seeds_dir()).await.unwrap();

        let entry = repo.get_config("company_name").await.unwrap();
        assert_eq!(entry.value, "Agro Norte");
        assert_eq!(entry.description, "Nombre de la empresa");
    }

    #[tokio::test]
    async fn test_run_seeds_missing_directory() {
        let repo = setup_test_db().await;

        let err = repo
            .run_seeds(Path::new("/nonexistent/seeds"))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to read seeds directory"));
    }

    // ── proformas ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_proforma_stores_items_in_order() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;

        let stored = store(&repo, draft("PF-1", c.id, day(10))).await.unwrap();

        assert_eq!(stored.number, "PF-1");
        assert_eq!(stored.currency, QuoteCurrency::Single(Currency::Crc));
        assert_eq!(stored.subtotal, dec!(2000));
        assert_eq!(stored.discount, dec!(100.00));
        assert_eq!(stored.total, dec!(2147.00));
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.items[0].model_name, "5075E");
        assert_eq!(stored.items[1].discount_amount, dec!(100.00));
        assert_eq!(stored.items[1].tax_rate, dec!(13));
        assert_eq!(stored.items[1].line_total, dec!(1017.00));
        assert_eq!(repo.get_proforma_by_number("PF-1").await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_rejected_and_nothing_is_written() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        store(&repo, draft("PF-1", c.id, day(10))).await.unwrap();

        let result = store(&repo, draft("PF-1", c.id, day(11))).await;

        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
        assert_eq!(repo.stats().await.unwrap().proformas, 1);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proforma_item")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(items, 2);
    }

    #[tokio::test]
    async fn test_unknown_customer_rolls_back() {
        let repo = setup_test_db().await;

        let result = store(&repo, draft("PF-1", 999, day(10))).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.stats().await.unwrap().proformas, 0);
    }

    #[tokio::test]
    async fn test_item_snapshot_ignores_catalog_price_change() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        let (_, model) = catalog(&repo).await;
        let mut item = NewProformaItem::new("John Deere", "5075E", 1, model.base_price, Currency::Usd);
        item.model_id = Some(model.id);
        let stored = store(
            &repo,
            ProformaDraft::new("PF-1", c.id, EquipmentType::Tractor, day(10)).with_item(item),
        )
        .await
        .unwrap();

        repo.update_model(
            model.id,
            &EquipmentModelUpdate {
                base_price: Some(dec!(40000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let reloaded = repo.get_proforma(stored.id).await.unwrap();
        assert_eq!(reloaded.items[0].unit_price, dec!(32000));
        assert_eq!(reloaded.items[0].model_id, Some(model.id));
        assert_eq!(reloaded.total, dec!(36160.00));
    }

    #[tokio::test]
    async fn test_deleting_model_keeps_item_snapshot() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        let (_, model) = catalog(&repo).await;
        let mut item = NewProformaItem::new("John Deere", "5075E", 1, dec!(32000), Currency::Usd);
        item.model_id = Some(model.id);
        let stored = store(
            &repo,
            ProformaDraft::new("PF-1", c.id, EquipmentType::Tractor, day(10)).with_item(item),
        )
        .await
        .unwrap();

        repo.delete_model(model.id).await.unwrap();

        let reloaded = repo.get_proforma(stored.id).await.unwrap();
        assert_eq!(reloaded.items[0].model_id, None);
        assert_eq!(reloaded.items[0].model_name, "5075E");
    }

    #[tokio::test]
    async fn test_mixed_currency_proforma_stores_marker() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        let d = ProformaDraft::new("PF-1", c.id, EquipmentType::Implement, day(10))
            .with_item(NewProformaItem::new("Kuhn", "BD-300", 1, dec!(100), Currency::Usd))
            .with_item(NewProformaItem::new("Kuhn", "BD-400", 1, dec!(1000), Currency::Crc));

        let stored = store(&repo, d).await.unwrap();

        assert_eq!(stored.currency, QuoteCurrency::Mixed);
        assert_eq!(stored.total, Decimal::ZERO);
        assert_eq!(stored.items[0].currency, Currency::Usd);
    }

    #[tokio::test]
    async fn test_list_proformas_newest_first_with_summary() {
        let repo = setup_test_db().await;
        let a = customer(&repo, "Finca A").await;
        let b = customer(&repo, "Finca B").await;
        store(&repo, draft("PF-1", a.id, day(10))).await.unwrap();
        store(&repo, draft("PF-2", b.id, day(11))).await.unwrap();
        store(&repo, draft("PF-3", a.id, day(12))).await.unwrap();

        let all = repo
            .list_proformas(&ProformaListFilter::default())
            .await
            .unwrap();
        let numbers: Vec<_> = all.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, vec!["PF-3", "PF-2", "PF-1"]);
        assert_eq!(all[0].customer_name, "Finca A");
        assert_eq!(all[0].item_count, 2);
        assert_eq!(all[0].advisor_name, None);

        let page = repo
            .list_proformas(&ProformaListFilter {
                customer_id: Some(a.id),
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].number, "PF-1");
    }

    async fn numbers(
        repo: &SqliteRepository,
        search: ProformaSearch,
    ) -> Vec<String> {
        repo.search_proformas(&search)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.number)
            .collect()
    }

    #[tokio::test]
    async fn test_search_proformas() {
        let repo = setup_test_db().await;
        let a = customer(&repo, "Finca La Esperanza").await;
        let b = repo
            .create_customer(NewCustomer {
                company: "Palmas del Caribe".to_string(),
                ..NewCustomer::named("Luis Mora")
            })
            .await
            .unwrap();
        store(&repo, draft("PF-20250110-1", a.id, day(10))).await.unwrap();
        store(
            &repo,
            ProformaDraft::new("PF-20250120-1", b.id, EquipmentType::Implement, day(20)).with_item(
                NewProformaItem::new("Massey Ferguson", "MF 4707", 1, dec!(30000), Currency::Usd),
            ),
        )
        .await
        .unwrap();

        assert_eq!(
            numbers(&repo, ProformaSearch {
                number: Some("0110".to_string()),
                ..Default::default()
            })
            .await,
            vec!["PF-20250110-1"]
        );
        assert_eq!(
            numbers(&repo, ProformaSearch {
                customer: Some("caribe".to_string()),
                ..Default::default()
            })
            .await,
            vec!["PF-20250120-1"]
        );
        assert_eq!(
            numbers(&repo, ProformaSearch {
                product: Some("kuhn".to_string()),
                ..Default::default()
            })
            .await,
            vec!["PF-20250110-1"]
        );
        assert_eq!(
            numbers(&repo, ProformaSearch {
                date_from: Some(day(10)),
                date_to: Some(day(10)),
                ..Default::default()
            })
            .await,
            vec!["PF-20250110-1"]
        );
        assert_eq!(
            numbers(&repo, ProformaSearch {
                template: Some(EquipmentType::Implement),
                ..Default::default()
            })
            .await,
            vec!["PF-20250120-1"]
        );
        assert_eq!(numbers(&repo, ProformaSearch::default()).await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_proforma_cascades_to_items() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        let stored = store(&repo, draft("PF-1", c.id, day(10))).await.unwrap();

        repo.delete_proforma(stored.id).await.unwrap();

        assert_eq!(repo.get_proforma(stored.id).await, Err(RepositoryError::NotFound));
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proforma_item")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(repo.delete_proforma(stored.id).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_set_document_path() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca La Esperanza").await;
        let stored = store(&repo, draft("PF-1", c.id, day(10))).await.unwrap();

        repo.set_document_path(stored.id, "out/PF-1.txt").await.unwrap();

        assert_eq!(
            repo.get_proforma(stored.id).await.unwrap().document_path,
            Some("out/PF-1.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_stats_counts_records() {
        let repo = setup_test_db().await;
        let c = customer(&repo, "Finca A").await;
        let inactive = customer(&repo, "Finca B").await;
        repo.update_customer(
            inactive.id,
            &CustomerUpdate {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.create_advisor(NewAdvisor::named("Ana")).await.unwrap();
        catalog(&repo).await;
        store(&repo, draft("PF-1", c.id, day(10))).await.unwrap();

        assert_eq!(
            repo.stats().await.unwrap(),
            ProformaStats {
                customers: 2,
                active_customers: 1,
                advisors: 1,
                brands: 1,
                models: 1,
                proformas: 1,
            }
        );
    }
}
