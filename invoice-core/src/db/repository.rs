use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Article, Customer, Invoice, InvoiceEdit, NewArticle, NewCustomer, NewInvoice,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// The system of record for customers, the article catalog and invoices.
///
/// Implementations store inputs only. Invoice totals are never persisted:
/// every invoice handed out has `totals` freshly aggregated from its lines.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    // Customers
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError>;
    async fn get_customer(&self, id: i64) -> Result<Customer, RepositoryError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError>;
    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn delete_customer(&self, id: i64) -> Result<(), RepositoryError>;

    // Article catalog
    async fn list_articles(&self) -> Result<Vec<Article>, RepositoryError>;
    async fn get_article(&self, id: i64) -> Result<Article, RepositoryError>;
    async fn get_article_by_ean(&self, ean: &str) -> Result<Article, RepositoryError>;

    /// Inserts the article, or replaces description, price and tax rate of
    /// the existing article with the same EAN.
    async fn upsert_article(&self, article: NewArticle) -> Result<Article, RepositoryError>;

    // Invoices
    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError>;
    async fn get_invoice(&self, id: i64) -> Result<Invoice, RepositoryError>;
    async fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError>;

    /// Persists customer, date and lines of a draft `invoice` as a single
    /// unit. Line order is preserved; line ids are not.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the invoice is published.
    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), RepositoryError>;

    /// Marks a draft as published; publishing twice is a
    /// [`RepositoryError::Conflict`].
    async fn publish_invoice(&self, id: i64) -> Result<(), RepositoryError>;
}

/// Loads, edits and stores an invoice in one step.
///
/// Domain rule violations (published invoice, invalid line) surface as
/// [`RepositoryError::Conflict`] so callers deal with a single error type.
pub async fn edit_invoice<R: InvoiceRepository + ?Sized>(
    repo: &R,
    id: i64,
    edit: InvoiceEdit,
) -> Result<Invoice, RepositoryError> {
    let mut invoice = repo.get_invoice(id).await?;
    invoice
        .apply_edit(edit)
        .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
    repo.update_invoice(&invoice).await?;
    Ok(invoice)
}

/// Publishes a draft after checking it is not already published.
pub async fn publish_invoice<R: InvoiceRepository + ?Sized>(
    repo: &R,
    id: i64,
) -> Result<Invoice, RepositoryError> {
    let mut invoice = repo.get_invoice(id).await?;
    invoice
        .publish()
        .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
    repo.publish_invoice(id).await?;
    Ok(invoice)
}
