use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::LineItem;

/// Catalog entry offered when adding a line to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub ean: String,
    pub description: String,
    pub unit_price: Decimal,
    /// Fractional rate, `0.19` for 19%.
    pub tax_rate: Decimal,
}

/// For creating or replacing catalog entries (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub ean: String,
    pub description: String,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

impl Article {
    /// Picker label, `"{ean} - {description}"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.ean, self.description)
    }

    /// Seeds an undiscounted line with the catalog price and tax rate.
    pub fn to_line(
        &self,
        quantity: Decimal,
    ) -> LineItem {
        LineItem::new(quantity, self.unit_price, self.tax_rate)
    }

    pub fn find_by_ean<'a>(
        articles: &'a [Article],
        ean: &str,
    ) -> Option<&'a Article> {
        articles.iter().find(|a| a.ean == ean)
    }
}
