use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoice_core::{
    Article, Customer, Invoice, InvoiceLine, InvoiceRepository, InvoiceStatus, InvoiceTotals,
    LineItem, NewArticle, NewCustomer, NewInvoice, RepositoryError, aggregate,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, Sqlite};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Turns a bare path or `:memory:` into a sqlx connection URL. Values that
/// already start with `sqlite:` are passed through.
pub fn database_url(connection_string: &str) -> String {
    if connection_string.starts_with("sqlite:") {
        connection_string.to_string()
    } else {
        format!("sqlite:{connection_string}")
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl SqliteRepository {
    /// Connects to `connection_string` (see [`database_url`]), creating the
    /// database file if it does not exist.
    ///
    /// An in-memory database lives only as long as its connection, so it is
    /// opened on a single, never-recycled connection.
    pub async fn new(connection_string: &str) -> Result<Self, RepositoryError> {
        let url = database_url(connection_string);
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| RepositoryError::Configuration(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if is_in_memory(&url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        debug!(url = %url, "connected to sqlite");
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_lines(
        &self,
        invoice_id: i64,
    ) -> Result<Vec<InvoiceLine>, RepositoryError> {
        let rows: Vec<InvoiceLineRow> = sqlx::query_as(
            "SELECT id, article_id, description, quantity, unit_price,
                    percent_discount, fixed_discount, tax_rate
             FROM invoice_line WHERE invoice_id = ? ORDER BY position",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

/// Maps constraint violations to [`RepositoryError::Conflict`], everything
/// else to [`RepositoryError::Database`].
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return RepositoryError::Conflict(db.message().to_string());
        }
    }
    RepositoryError::Database(e.to_string())
}

/// Explains why a draft-only update touched no row: the invoice is either
/// missing or already published.
async fn not_a_draft<'e, E>(executor: E, id: i64) -> RepositoryError
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let status: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM invoice WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await;

    match status {
        Ok(None) => RepositoryError::NotFound,
        Ok(Some(status)) => {
            warn!(invoice_id = id, status = %status, "rejected write to non-draft invoice");
            RepositoryError::Conflict(format!("invoice {id} is {status} and read-only"))
        }
        Err(e) => map_sqlx_error(e),
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>()
        .map_err(|e| RepositoryError::Database(format!("Failed to parse decimal '{}': {}", s, e)))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Database(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(FromRow)]
struct CustomerRow {
    id: i64,
    company_name: String,
    first_name: String,
    last_name: String,
    email: String,
    address: String,
    city: String,
    country: String,
    zip: String,
    homepage: String,
    uid: String,
    salutation: String,
    title: String,
    phone_number: String,
    mobile_number: String,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            company_name: row.company_name,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            address: row.address,
            city: row.city,
            country: row.country,
            zip: row.zip,
            homepage: row.homepage,
            uid: row.uid,
            salutation: row.salutation,
            title: row.title,
            phone_number: row.phone_number,
            mobile_number: row.mobile_number,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, company_name, first_name, last_name, email, address, city,
     country, zip, homepage, uid, salutation, title, phone_number, mobile_number";

#[derive(FromRow)]
struct ArticleRow {
    id: i64,
    ean: String,
    description: String,
    unit_price: String,
    tax_rate: String,
}

impl TryFrom<ArticleRow> for Article {
    type Error = RepositoryError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Article {
            id: row.id,
            ean: row.ean,
            description: row.description,
            unit_price: parse_decimal(&row.unit_price)?,
            tax_rate: parse_decimal(&row.tax_rate)?,
        })
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    id: i64,
    invoice_number: String,
    customer_id: i64,
    status: String,
    created_at: String,
}

impl InvoiceRow {
    fn into_invoice(
        self,
        lines: Vec<InvoiceLine>,
    ) -> Result<Invoice, RepositoryError> {
        let status = InvoiceStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::Database(format!("Invalid invoice status: {}", self.status))
        })?;
        let mut invoice = Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            customer_id: self.customer_id,
            lines,
            totals: InvoiceTotals::ZERO,
            status,
            created_at: parse_datetime(&self.created_at)?,
        };
        invoice.recalculate();
        Ok(invoice)
    }
}

const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, status, created_at";

#[derive(FromRow)]
struct InvoiceLineRow {
    id: i64,
    article_id: Option<i64>,
    description: String,
    quantity: String,
    unit_price: String,
    percent_discount: String,
    fixed_discount: String,
    tax_rate: String,
}

impl TryFrom<InvoiceLineRow> for InvoiceLine {
    type Error = RepositoryError;

    fn try_from(row: InvoiceLineRow) -> Result<Self, Self::Error> {
        Ok(InvoiceLine {
            id: Some(row.id),
            article_id: row.article_id,
            description: row.description,
            item: LineItem {
                quantity: parse_decimal(&row.quantity)?,
                unit_price: parse_decimal(&row.unit_price)?,
                percent_discount: parse_decimal(&row.percent_discount)?,
                fixed_discount: parse_decimal(&row.fixed_discount)?,
                tax_rate: parse_decimal(&row.tax_rate)?,
            },
        })
    }
}

#[async_trait]
impl InvoiceRepository for SqliteRepository {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer (
                company_name, first_name, last_name, email, address, city, country,
                zip, homepage, uid, salutation, title, phone_number, mobile_number
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.company_name)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.country)
        .bind(&customer.zip)
        .bind(&customer.homepage)
        .bind(&customer.uid)
        .bind(&customer.salutation)
        .bind(&customer.title)
        .bind(&customer.phone_number)
        .bind(&customer.mobile_number)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        info!(customer_id = id, "customer created");
        Ok(Customer::from_new(id, customer))
    }

    async fn get_customer(&self, id: i64) -> Result<Customer, RepositoryError> {
        let row: CustomerRow =
            sqlx::query_as(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows: Vec<CustomerRow> =
            sqlx::query_as(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer SET
                company_name = ?, first_name = ?, last_name = ?, email = ?, address = ?,
                city = ?, country = ?, zip = ?, homepage = ?, uid = ?, salutation = ?,
                title = ?, phone_number = ?, mobile_number = ?
             WHERE id = ?",
        )
        .bind(&customer.company_name)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.country)
        .bind(&customer.zip)
        .bind(&customer.homepage)
        .bind(&customer.uid)
        .bind(&customer.salutation)
        .bind(&customer.title)
        .bind(&customer.phone_number)
        .bind(&customer.mobile_number)
        .bind(customer.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_customer(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!(customer_id = id, "customer deleted");
        Ok(())
    }

    async fn list_articles(&self) -> Result<Vec<Article>, RepositoryError> {
        let rows: Vec<ArticleRow> = sqlx::query_as(
            "SELECT id, ean, description, unit_price, tax_rate FROM article ORDER BY ean",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get_article(&self, id: i64) -> Result<Article, RepositoryError> {
        let row: ArticleRow = sqlx::query_as(
            "SELECT id, ean, description, unit_price, tax_rate FROM article WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn get_article_by_ean(&self, ean: &str) -> Result<Article, RepositoryError> {
        let row: ArticleRow = sqlx::query_as(
            "SELECT id, ean, description, unit_price, tax_rate FROM article WHERE ean = ?",
        )
        .bind(ean)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn upsert_article(&self, article: NewArticle) -> Result<Article, RepositoryError> {
        sqlx::query(
            "INSERT INTO article (ean, description, unit_price, tax_rate)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (ean) DO UPDATE SET
                description = excluded.description,
                unit_price = excluded.unit_price,
                tax_rate = excluded.tax_rate",
        )
        .bind(&article.ean)
        .bind(&article.description)
        .bind(article.unit_price.to_string())
        .bind(article.tax_rate.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(ean = %article.ean, "article upserted");
        self.get_article_by_ean(&article.ean).await
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        let now = format_datetime(&Utc::now());

        let result = sqlx::query(
            "INSERT INTO invoice (invoice_number, customer_id, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.customer_id)
        .bind(InvoiceStatus::Draft.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        info!(invoice_id = id, invoice = %invoice.invoice_number, "invoice created");
        self.get_invoice(id).await
    }

    async fn get_invoice(&self, id: i64) -> Result<Invoice, RepositoryError> {
        let row: InvoiceRow =
            sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoice WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(RepositoryError::NotFound)?;

        let lines = self.load_lines(id).await?;
        row.into_invoice(lines)
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoice ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.load_lines(row.id).await?;
            invoices.push(row.into_invoice(lines)?);
        }
        Ok(invoices)
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            "UPDATE invoice SET customer_id = ?, created_at = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(invoice.customer_id)
        .bind(format_datetime(&invoice.created_at))
        .bind(&now)
        .bind(invoice.id)
        .bind(InvoiceStatus::Draft.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(not_a_draft(&mut *tx, invoice.id).await);
        }

        sqlx::query("DELETE FROM invoice_line WHERE invoice_id = ?")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        // Line ids are reassigned on every save.
        for (position, line) in invoice.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO invoice_line (
                    invoice_id, position, article_id, description, quantity, unit_price,
                    percent_discount, fixed_discount, tax_rate
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(invoice.id)
            .bind(position as i64)
            .bind(line.article_id)
            .bind(&line.description)
            .bind(line.item.quantity.to_string())
            .bind(line.item.unit_price.to_string())
            .bind(line.item.percent_discount.to_string())
            .bind(line.item.fixed_discount.to_string())
            .bind(line.item.tax_rate.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        info!(
            invoice_id = invoice.id,
            lines = invoice.lines.len(),
            total = %aggregate(&invoice.items()).total,
            "invoice updated"
        );
        Ok(())
    }

    async fn publish_invoice(&self, id: i64) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        let result = sqlx::query(
            "UPDATE invoice SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(InvoiceStatus::Published.as_str())
        .bind(&now)
        .bind(id)
        .bind(InvoiceStatus::Draft.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(not_a_draft(&self.pool, id).await);
        }

        info!(invoice_id = id, "invoice published");
        Ok(())
    }
}
