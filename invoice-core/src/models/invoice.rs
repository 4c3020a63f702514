use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::{InvoiceTotals, LineAmounts, aggregate, compute_line};
use crate::models::line_item::{LineItem, LineItemError};

/// One row of an invoice: what was sold, plus its numeric inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Storage id; `None` for rows added in the current edit.
    pub id: Option<i64>,
    /// Catalog article the row was picked from, if any.
    pub article_id: Option<i64>,
    pub description: String,
    pub item: LineItem,
}

impl InvoiceLine {
    pub fn new(
        description: impl Into<String>,
        item: LineItem,
    ) -> Self {
        Self {
            id: None,
            article_id: None,
            description: description.into(),
            item,
        }
    }

    pub fn amounts(&self) -> LineAmounts {
        compute_line(&self.item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Published,
}

impl InvoiceStatus {
    /// Maps the API's `draft` / `published` flags. `published` wins; an
    /// invoice with neither flag set has no known status.
    pub fn from_flags(
        draft: bool,
        published: bool,
    ) -> Option<Self> {
        if published {
            Some(Self::Published)
        } else if draft {
            Some(Self::Draft)
        } else {
            None
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
        }
    }
}

/// Errors raised while editing or publishing an invoice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("invoice {0} is published and can no longer be changed")]
    AlreadyPublished(String),

    #[error("line {index}: {source}")]
    InvalidLine {
        index: usize,
        #[source]
        source: LineItemError,
    },

    #[error("line {index}: description must not be empty")]
    MissingDescription { index: usize },

    #[error("invoice number must not be empty")]
    MissingInvoiceNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub lines: Vec<InvoiceLine>,

    // Calculated values, refreshed by `recalculate`
    pub totals: InvoiceTotals,

    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// For creating new invoices (no id, lines or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub customer_id: i64,
    pub invoice_number: String,
}

impl NewInvoice {
    pub fn validate(&self) -> Result<(), InvoiceError> {
        if self.invoice_number.trim().is_empty() {
            return Err(InvoiceError::MissingInvoiceNumber);
        }
        Ok(())
    }
}

/// Everything the edit form can change on a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEdit {
    pub customer_id: i64,
    pub invoice_date: NaiveDate,
    pub lines: Vec<InvoiceLine>,
}

impl InvoiceEdit {
    /// Validates every line, reporting the first offending line index.
    pub fn validate(&self) -> Result<(), InvoiceError> {
        for (index, line) in self.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                return Err(InvoiceError::MissingDescription { index });
            }
            line.item
                .validate()
                .map_err(|source| InvoiceError::InvalidLine { index, source })?;
        }
        Ok(())
    }

    /// Start-of-day UTC timestamp for the edited invoice date.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.invoice_date.and_time(NaiveTime::MIN).and_utc()
    }
}

impl Invoice {
    /// A fresh draft with no lines.
    pub fn draft(
        id: i64,
        new: NewInvoice,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            invoice_number: new.invoice_number,
            customer_id: new.customer_id,
            lines: Vec::new(),
            totals: InvoiceTotals::ZERO,
            status: InvoiceStatus::Draft,
            created_at,
        }
    }

    pub fn items(&self) -> Vec<LineItem> {
        self.lines.iter().map(|l| l.item).collect()
    }

    /// Lines paired with their derived amounts, in display order.
    pub fn line_amounts(&self) -> impl Iterator<Item = (&InvoiceLine, LineAmounts)> + '_ {
        self.lines.iter().map(|l| (l, l.amounts()))
    }

    /// Refreshes `totals` from the current lines.
    pub fn recalculate(&mut self) {
        self.totals = aggregate(&self.items());
    }

    /// Replaces customer, date and lines, then recomputes totals.
    ///
    /// # Errors
    ///
    /// - [`InvoiceError::AlreadyPublished`] once the invoice is published
    /// - any validation error from [`InvoiceEdit::validate`]
    pub fn apply_edit(
        &mut self,
        edit: InvoiceEdit,
    ) -> Result<(), InvoiceError> {
        if self.status.is_published() {
            return Err(InvoiceError::AlreadyPublished(self.invoice_number.clone()));
        }
        edit.validate()?;

        self.created_at = edit.created_at();
        self.customer_id = edit.customer_id;
        self.lines = edit.lines;
        self.recalculate();

        debug!(
            invoice = %self.invoice_number,
            lines = self.lines.len(),
            total = %self.totals.total,
            "applied invoice edit"
        );
        Ok(())
    }

    /// Moves a draft to published. Published invoices are read-only.
    pub fn publish(&mut self) -> Result<(), InvoiceError> {
        if self.status.is_published() {
            return Err(InvoiceError::AlreadyPublished(self.invoice_number.clone()));
        }
        self.status = InvoiceStatus::Published;
        info!(invoice = %self.invoice_number, "invoice published");
        Ok(())
    }
}
