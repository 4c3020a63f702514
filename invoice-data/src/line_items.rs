use std::io::Read;

use invoice_core::{Article, InvoiceLine, LineItem, LineItemError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineItemCsvError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("row {row}: {source}")]
    InvalidLine {
        row: usize,
        #[source]
        source: LineItemError,
    },

    #[error("row {row}: no article with EAN '{ean}' in the catalog")]
    UnknownArticle { row: usize, ean: String },

    #[error("row {row}: description must not be empty")]
    MissingDescription { row: usize },

    #[error("row {row}: {column} is empty and the row names no article")]
    MissingValue { row: usize, column: &'static str },
}

impl From<csv::Error> for LineItemCsvError {
    fn from(err: csv::Error) -> Self {
        LineItemCsvError::CsvParse(err.to_string())
    }
}

/// A single row of an invoice lines CSV file.
///
/// Rates are fractions (`0.19` for 19%). Empty discount cells, or missing
/// discount columns, mean no discount. `ean` is optional and links the row
/// to a catalog article, whose price and tax rate fill empty cells.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LineItemRecord {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_decimal_or_zero")]
    pub percent_discount: Decimal,
    #[serde(default, deserialize_with = "deserialize_decimal_or_zero")]
    pub fixed_discount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub ean: Option<String>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_optional_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}

impl LineItemRecord {
    /// The row's numeric inputs. Empty price and tax rate cells are taken
    /// from `article`.
    pub fn item(
        &self,
        row: usize,
        article: Option<&Article>,
    ) -> Result<LineItem, LineItemCsvError> {
        let catalog = article.map(|a| a.to_line(self.quantity));
        let unit_price = self
            .unit_price
            .or(catalog.map(|c| c.unit_price))
            .ok_or(LineItemCsvError::MissingValue {
                row,
                column: "unit_price",
            })?;
        let tax_rate = self
            .tax_rate
            .or(catalog.map(|c| c.tax_rate))
            .ok_or(LineItemCsvError::MissingValue {
                row,
                column: "tax_rate",
            })?;

        Ok(LineItem {
            quantity: self.quantity,
            unit_price,
            percent_discount: self.percent_discount,
            fixed_discount: self.fixed_discount,
            tax_rate,
        })
    }

    /// The catalog EAN, if the cell is present and not blank.
    pub fn article_ean(&self) -> Option<&str> {
        self.ean.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Reader for invoice lines kept in CSV, as used by `invoicer compute` and
/// `invoicer invoice edit`.
pub struct LineItemCsv;

impl LineItemCsv {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<LineItemRecord>, LineItemCsvError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: LineItemRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Validates the records and turns them into invoice lines, in file
    /// order.
    ///
    /// A row with an `ean` is linked to that catalog article; its
    /// description, price and tax rate fall back to the article's when the
    /// cells are empty.
    /// Rows are numbered from 1 in errors.
    pub fn to_lines(
        records: &[LineItemRecord],
        catalog: &[Article],
    ) -> Result<Vec<InvoiceLine>, LineItemCsvError> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let row = index + 1;
                let article = match record.article_ean() {
                    Some(ean) => Some(Article::find_by_ean(catalog, ean).ok_or_else(|| {
                        LineItemCsvError::UnknownArticle {
                            row,
                            ean: ean.to_string(),
                        }
                    })?),
                    None => None,
                };

                let item = record.item(row, article)?;
                item.validate()
                    .map_err(|source| LineItemCsvError::InvalidLine { row, source })?;

                let description = match (record.description.trim(), article) {
                    ("", Some(article)) => article.description.clone(),
                    ("", None) => return Err(LineItemCsvError::MissingDescription { row }),
                    (text, _) => text.to_string(),
                };

                let mut line = InvoiceLine::new(description, item);
                line.article_id = article.map(|a| a.id);
                Ok(line)
            })
            .collect()
    }
}
