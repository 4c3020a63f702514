use std::io::Read;

use invoice_core::{InvoiceRepository, NewArticle, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading the article catalog.
#[derive(Debug, Error)]
pub enum ArticleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("row {row}: EAN must not be empty")]
    MissingEan { row: usize },

    #[error("row {row}: unit price must not be negative, got {value}")]
    NegativeUnitPrice { row: usize, value: Decimal },

    #[error("row {row}: tax rate must be within [0, 1], got {value}")]
    TaxRateOutOfRange { row: usize, value: Decimal },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for ArticleLoaderError {
    fn from(err: csv::Error) -> Self {
        ArticleLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the article catalog CSV file.
///
/// - `ean`: European article number, the natural key of the catalog
/// - `description`: Text copied onto invoice lines
/// - `unit_price`: Net price of one unit
/// - `tax_rate`: Fractional tax rate (e.g., 0.19 for 19%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArticleRecord {
    pub ean: String,
    pub description: String,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

impl ArticleRecord {
    /// `row` is the 1-based data row, used in error messages.
    fn validate(&self, row: usize) -> Result<(), ArticleLoaderError> {
        if self.ean.trim().is_empty() {
            return Err(ArticleLoaderError::MissingEan { row });
        }
        if self.unit_price < Decimal::ZERO {
            return Err(ArticleLoaderError::NegativeUnitPrice {
                row,
                value: self.unit_price,
            });
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ArticleLoaderError::TaxRateOutOfRange {
                row,
                value: self.tax_rate,
            });
        }
        Ok(())
    }
}

impl From<&ArticleRecord> for NewArticle {
    fn from(record: &ArticleRecord) -> Self {
        NewArticle {
            ean: record.ean.trim().to_string(),
            description: record.description.clone(),
            unit_price: record.unit_price,
            tax_rate: record.tax_rate,
        }
    }
}

/// Loader for the article catalog.
///
/// Works through the [`InvoiceRepository`] trait so any backend can be
/// filled from the same file.
pub struct ArticleCatalogLoader;

impl ArticleCatalogLoader {
    /// Parse article records from a CSV reader.
    ///
    /// Surrounding whitespace in every cell is ignored.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<ArticleRecord>, ArticleLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: ArticleRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert every record by EAN and return how many were written.
    ///
    /// All records are validated before the first write, so an invalid row
    /// leaves the catalog untouched. Writes are not batched: a repository
    /// error stops the load with the earlier rows already stored, and
    /// rerunning the file completes it. Loading the same file twice yields
    /// the same catalog; when a file repeats an EAN, the later row wins.
    pub async fn load<R: InvoiceRepository + ?Sized>(
        repo: &R,
        records: &[ArticleRecord],
    ) -> Result<usize, ArticleLoaderError> {
        for (index, record) in records.iter().enumerate() {
            record.validate(index + 1)?;
        }

        let mut written = 0;
        for record in records {
            let article = repo.upsert_article(record.into()).await?;
            debug!(id = article.id, ean = %article.ean, "loaded article");
            written += 1;
        }

        info!(articles = written, "article catalog loaded");
        Ok(written)
    }
}
