use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use invoice_core::db::{RepositoryRegistry, edit_invoice, publish_invoice};
use invoice_core::payload::{
    CreateInvoicePayload, InvoiceDetailPayload, InvoicePayload, InvoiceResponse, LinesPayload,
    PublishInvoicePayload,
};
use invoice_core::{
    Article, InvoiceEdit, InvoiceLine, InvoiceRepository, NewInvoice, RepositoryError,
};
use invoice_data::{LineItemCsv, LineItemRecord};
use invoice_db_sqlite::SqliteRepositoryFactory;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cli::CustomerFields;
use crate::render;

/// Builds a registry containing every backend compiled into this binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub fn read_line_records(path: &Path) -> Result<Vec<LineItemRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    LineItemCsv::parse(file).with_context(|| format!("Failed to parse CSV: {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))
}

/// True when any record refers to a catalog article, so the catalog must be
/// loaded to resolve it.
pub fn needs_catalog(records: &[LineItemRecord]) -> bool {
    records.iter().any(|r| r.article_ean().is_some())
}

// ─── compute ─────────────────────────────────────────────────────────────────

pub fn compute(
    records: &[LineItemRecord],
    catalog: &[Article],
    currency: &str,
    json: bool,
) -> Result<String> {
    let lines = LineItemCsv::to_lines(records, catalog)?;
    debug!(lines = lines.len(), "computing lines");

    if json {
        let payload = LinesPayload::from_lines(&lines);
        return Ok(serde_json::to_string_pretty(&payload)?);
    }

    let items: Vec<_> = lines.iter().map(|l| l.item).collect();
    let totals = invoice_core::aggregate(&items);
    Ok(format!(
        "{}\n{}",
        render::line_table(&lines, currency),
        render::totals_block(&totals, currency)
    ))
}

// ─── customers ───────────────────────────────────────────────────────────────

pub async fn add_customer(
    repo: &dyn InvoiceRepository,
    fields: CustomerFields,
) -> Result<String> {
    let customer = repo
        .create_customer(fields.into_new())
        .await
        .context("Failed to create customer")?;
    Ok(format!(
        "Created customer {}: {}",
        customer.id,
        customer.display_name()
    ))
}

pub async fn list_customers(repo: &dyn InvoiceRepository) -> Result<String> {
    let customers = repo.list_customers().await?;
    Ok(render::customer_table(&customers))
}

pub async fn show_customer(
    repo: &dyn InvoiceRepository,
    id: i64,
) -> Result<String> {
    let customer = repo
        .get_customer(id)
        .await
        .with_context(|| format!("Customer {id}"))?;
    Ok(render::customer_detail(&customer))
}

pub async fn update_customer(
    repo: &dyn InvoiceRepository,
    id: i64,
    fields: CustomerFields,
) -> Result<String> {
    if fields.is_empty() {
        bail!("nothing to update; pass at least one field");
    }
    let mut customer = repo
        .get_customer(id)
        .await
        .with_context(|| format!("Customer {id}"))?;
    fields.apply_to(&mut customer);
    repo.update_customer(&customer)
        .await
        .with_context(|| format!("Failed to update customer {id}"))?;
    Ok(format!("Updated customer {id}"))
}

pub async fn delete_customer(
    repo: &dyn InvoiceRepository,
    id: i64,
) -> Result<String> {
    repo.delete_customer(id)
        .await
        .with_context(|| format!("Failed to delete customer {id}"))?;
    Ok(format!("Deleted customer {id}"))
}

// ─── articles ────────────────────────────────────────────────────────────────

pub async fn list_articles(
    repo: &dyn InvoiceRepository,
    currency: &str,
) -> Result<String> {
    let articles = repo.list_articles().await?;
    Ok(render::article_table(&articles, currency))
}

// ─── invoices ────────────────────────────────────────────────────────────────

pub async fn new_invoice(
    repo: &dyn InvoiceRepository,
    new: NewInvoice,
    json: bool,
) -> Result<String> {
    new.validate()?;
    repo.get_customer(new.customer_id)
        .await
        .with_context(|| format!("Customer {}", new.customer_id))?;
    let body = CreateInvoicePayload::from(&new);
    let invoice = repo
        .create_invoice(new)
        .await
        .context("Failed to create invoice")?;

    if json {
        return Ok(serde_json::to_string_pretty(&body)?);
    }
    Ok(format!(
        "Created draft {} with id {}",
        invoice.invoice_number, invoice.id
    ))
}

pub async fn list_invoices(
    repo: &dyn InvoiceRepository,
    currency: &str,
) -> Result<String> {
    let invoices = repo.list_invoices().await?;
    Ok(render::invoice_table(&invoices, currency))
}

pub async fn show_invoice(
    repo: &dyn InvoiceRepository,
    id: i64,
    currency: &str,
    json: bool,
) -> Result<String> {
    let invoice = repo
        .get_invoice(id)
        .await
        .with_context(|| format!("Invoice {id}"))?;

    if json {
        let response = InvoiceResponse {
            invoice: InvoiceDetailPayload::from(&invoice),
            message: None,
        };
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    let customer = match repo.get_customer(invoice.customer_id).await {
        Ok(customer) => Some(customer),
        Err(RepositoryError::NotFound) => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Customer {}", invoice.customer_id));
        }
    };
    Ok(render::invoice_detail(&invoice, customer.as_ref(), currency))
}

/// What `invoice edit` changes besides the lines.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    pub customer_id: Option<i64>,
    pub invoice_date: Option<NaiveDate>,
    /// Answer with the `PUT /invoices/{id}` body instead of the totals.
    pub json: bool,
}

pub async fn edit_lines(
    repo: &dyn InvoiceRepository,
    id: i64,
    records: &[LineItemRecord],
    options: EditOptions,
    currency: &str,
) -> Result<String> {
    let current = repo
        .get_invoice(id)
        .await
        .with_context(|| format!("Invoice {id}"))?;
    let catalog = if needs_catalog(records) {
        repo.list_articles().await?
    } else {
        Vec::new()
    };
    let lines: Vec<InvoiceLine> = LineItemCsv::to_lines(records, &catalog)?;

    let edit = InvoiceEdit {
        customer_id: options.customer_id.unwrap_or(current.customer_id),
        invoice_date: options
            .invoice_date
            .unwrap_or_else(|| current.created_at.date_naive()),
        lines,
    };
    save_edit(repo, id, &current.invoice_number, edit, currency, options.json).await
}

/// Applies a `PUT /invoices/{id}` body read from `path`.
pub async fn edit_from_payload(
    repo: &dyn InvoiceRepository,
    id: i64,
    path: &Path,
    currency: &str,
    json: bool,
) -> Result<String> {
    let payload: InvoicePayload = read_json(path)?;
    let current = repo
        .get_invoice(id)
        .await
        .with_context(|| format!("Invoice {id}"))?;
    save_edit(repo, id, &current.invoice_number, payload.into_edit(), currency, json).await
}

async fn save_edit(
    repo: &dyn InvoiceRepository,
    id: i64,
    invoice_number: &str,
    edit: InvoiceEdit,
    currency: &str,
    json: bool,
) -> Result<String> {
    let body = json.then(|| InvoicePayload::from_edit(&edit));
    let invoice = edit_invoice(repo, id, edit)
        .await
        .with_context(|| format!("Failed to edit invoice {invoice_number}"))?;

    if let Some(body) = body {
        return Ok(serde_json::to_string_pretty(&body)?);
    }
    Ok(format!(
        "Saved {} line(s) on {}\n\n{}",
        invoice.lines.len(),
        invoice.invoice_number,
        render::totals_block(&invoice.totals, currency)
    ))
}

pub async fn publish(
    repo: &dyn InvoiceRepository,
    id: i64,
    json: bool,
) -> Result<String> {
    let invoice = publish_invoice(repo, id)
        .await
        .with_context(|| format!("Failed to publish invoice {id}"))?;

    if json {
        let body = PublishInvoicePayload::from(&invoice);
        return Ok(serde_json::to_string_pretty(&body)?);
    }
    Ok(format!("Published {}", invoice.invoice_number))
}

/// Recreates an invoice from a `GET /invoices/{id}` response, as printed by
/// `invoice show --json`.
///
/// The invoice gets a new id under the exported number and customer; lines
/// and date are copied and the invoice is published again if it was. Lines
/// are validated before anything is written.
pub async fn import_invoice(
    repo: &dyn InvoiceRepository,
    path: &Path,
) -> Result<String> {
    let response: InvoiceResponse = read_json(path)?;
    let exported = response.invoice.into_invoice()?;

    let new = NewInvoice {
        customer_id: exported.customer_id,
        invoice_number: exported.invoice_number.clone(),
    };
    new.validate()?;
    let edit = InvoiceEdit {
        customer_id: exported.customer_id,
        invoice_date: exported.created_at.date_naive(),
        lines: exported.lines,
    };
    edit.validate()?;

    let created = repo
        .create_invoice(new)
        .await
        .with_context(|| format!("Failed to create invoice {}", exported.invoice_number))?;
    let mut invoice = edit_invoice(repo, created.id, edit).await?;
    if exported.status.is_published() {
        invoice = publish_invoice(repo, created.id).await?;
    }

    info!(invoice = %invoice.invoice_number, id = invoice.id, "invoice imported");
    Ok(format!(
        "Imported {} as {} with id {}",
        invoice.invoice_number,
        exported.status.label(),
        invoice.id
    ))
}
