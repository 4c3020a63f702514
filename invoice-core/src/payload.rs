//! JSON bodies exchanged with the invoicing API.
//!
//! The API names the quantity `amount` and the fixed discount
//! `euro_discount`; everything else keeps its name. Monetary values and rates
//! travel as JSON numbers. Derived fields (`net_price`, `tax_amount`,
//! `gross_price` and the invoice totals) are always produced by
//! [`compute_line`](crate::compute_line) and [`aggregate`] when encoding, and ignored and
//! recomputed when decoding.
//!
//! | Request                      | Body                      |
//! |------------------------------|---------------------------|
//! | `POST /invoices`             | [`CreateInvoicePayload`]  |
//! | `PUT /invoices/{id}`         | [`InvoicePayload`]        |
//! | `PUT /invoices/publish/{id}` | [`PublishInvoicePayload`] |
//! | `GET /invoices/{id}`         | [`InvoiceResponse`]       |

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::round_half_up;
use crate::calculations::{InvoiceTotals, aggregate};
use crate::models::{Invoice, InvoiceEdit, InvoiceLine, InvoiceStatus, LineItem, NewInvoice};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invoice {0} is neither draft nor published")]
    UnknownStatus(String),
}

/// One entry of the `articles` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
    #[serde(default)]
    pub description: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percent_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub euro_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,

    // Derived
    #[serde(default, with = "rust_decimal::serde::float")]
    pub net_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub gross_price: Decimal,
}

impl ArticlePayload {
    pub fn from_line(line: &InvoiceLine) -> Self {
        let amounts = line.amounts();
        Self {
            id: line.id,
            article_id: line.article_id,
            description: line.description.clone(),
            amount: line.item.quantity,
            unit_price: line.item.unit_price,
            percent_discount: line.item.percent_discount,
            euro_discount: line.item.fixed_discount,
            tax_rate: line.item.tax_rate,
            net_price: amounts.net_price,
            tax_amount: amounts.tax_amount,
            gross_price: amounts.gross_price,
        }
    }
}

impl From<ArticlePayload> for InvoiceLine {
    fn from(payload: ArticlePayload) -> Self {
        Self {
            id: payload.id,
            article_id: payload.article_id,
            description: payload.description,
            item: LineItem {
                quantity: payload.amount,
                unit_price: payload.unit_price,
                percent_discount: payload.percent_discount,
                fixed_discount: payload.euro_discount,
                tax_rate: payload.tax_rate,
            },
        }
    }
}

/// Body of `PUT /invoices/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePayload {
    pub customer_id: i64,
    pub created_at: NaiveDate,
    pub articles: Vec<ArticlePayload>,

    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl InvoicePayload {
    pub fn from_edit(edit: &InvoiceEdit) -> Self {
        let articles: Vec<_> = edit.lines.iter().map(ArticlePayload::from_line).collect();
        let items: Vec<_> = edit.lines.iter().map(|l| l.item).collect();
        let totals = aggregate(&items);
        Self {
            customer_id: edit.customer_id,
            created_at: edit.invoice_date,
            articles,
            subtotal: totals.subtotal,
            tax_total: totals.tax_total,
            total_discount: totals.total_discount,
            total: totals.total,
        }
    }

    /// Decodes the body into an edit, dropping the transmitted derived values.
    pub fn into_edit(self) -> InvoiceEdit {
        InvoiceEdit {
            customer_id: self.customer_id,
            invoice_date: self.created_at,
            lines: self.articles.into_iter().map(InvoiceLine::from).collect(),
        }
    }
}

/// Body of `POST /invoices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoicePayload {
    pub customer_id: i64,
    pub invoice_number: String,
}

impl From<&NewInvoice> for CreateInvoicePayload {
    fn from(new: &NewInvoice) -> Self {
        Self {
            customer_id: new.customer_id,
            invoice_number: new.invoice_number.clone(),
        }
    }
}

/// Body of `PUT /invoices/publish/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishInvoicePayload {
    pub invoice_id: i64,
    pub invoice_number: String,
}

impl From<&Invoice> for PublishInvoicePayload {
    fn from(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: i64,
}

/// Invoice as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetailPayload {
    pub id: i64,
    pub invoice_number: String,
    pub customer: CustomerRef,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub articles: Vec<ArticlePayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub draft: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Envelope of `GET /invoices/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub invoice: InvoiceDetailPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Invoice> for InvoiceDetailPayload {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            customer: CustomerRef {
                id: invoice.customer_id,
            },
            articles: invoice.lines.iter().map(ArticlePayload::from_line).collect(),
            subtotal: invoice.totals.subtotal,
            tax_total: invoice.totals.tax_total,
            total_discount: invoice.totals.total_discount,
            total: invoice.totals.total,
            draft: invoice.status.is_draft(),
            published: invoice.status.is_published(),
            created_at: invoice.created_at,
        }
    }
}

/// Lines with their derived amounts and totals, without an invoice around
/// them. Printed by `invoicer compute --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesPayload {
    pub articles: Vec<ArticlePayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl LinesPayload {
    pub fn from_lines(lines: &[InvoiceLine]) -> Self {
        let items: Vec<_> = lines.iter().map(|l| l.item).collect();
        let totals = aggregate(&items);
        Self {
            articles: lines.iter().map(ArticlePayload::from_line).collect(),
            subtotal: totals.subtotal,
            tax_total: totals.tax_total,
            total_discount: totals.total_discount,
            total: totals.total,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ArticlePayload>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let articles: Option<Vec<ArticlePayload>> = Option::deserialize(deserializer)?;
    Ok(articles.unwrap_or_default())
}

impl InvoiceDetailPayload {
    /// Converts to the domain model. Totals are recomputed from the articles;
    /// a transmitted total that differs after rounding is logged and
    /// discarded.
    pub fn into_invoice(self) -> Result<Invoice, PayloadError> {
        let status = InvoiceStatus::from_flags(self.draft, self.published)
            .ok_or_else(|| PayloadError::UnknownStatus(self.invoice_number.clone()))?;

        let mut invoice = Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            customer_id: self.customer.id,
            lines: self.articles.into_iter().map(InvoiceLine::from).collect(),
            totals: InvoiceTotals::ZERO,
            status,
            created_at: self.created_at,
        };
        invoice.recalculate();

        if round_half_up(invoice.totals.total) != round_half_up(self.total) {
            warn!(
                invoice = %invoice.invoice_number,
                transmitted = %self.total,
                computed = %invoice.totals.total,
                "transmitted invoice total does not match its lines"
            );
        }

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn edit() -> InvoiceEdit {
        InvoiceEdit {
            customer_id: 12,
            invoice_date: NaiveDate::from_ymd_opt(2025, 4, 18).unwrap(),
            lines: vec![InvoiceLine {
                id: Some(31),
                article_id: Some(5),
                description: "Consulting".to_string(),
                item: LineItem {
                    quantity: dec!(2),
                    unit_price: dec!(100),
                    percent_discount: dec!(0.1),
                    fixed_discount: dec!(5),
                    tax_rate: dec!(0.19),
                },
            }],
        }
    }

    #[test]
    fn invoice_payload_uses_api_field_names() {
        let payload = InvoicePayload::from_edit(&edit());

        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "customer_id": 12,
                "created_at": "2025-04-18",
                "articles": [{
                    "id": 31,
                    "article_id": 5,
                    "description": "Consulting",
                    "amount": 2.0,
                    "unit_price": 100.0,
                    "percent_discount": 0.1,
                    "euro_discount": 5.0,
                    "tax_rate": 0.19,
                    "net_price": 180.0,
                    "tax_amount": 33.25,
                    "gross_price": 208.25
                }],
                "subtotal": 175.0,
                "tax_total": 33.25,
                "total_discount": 25.0,
                "total": 208.25
            })
        );
    }

    #[test]
    fn new_rows_omit_ids() {
        let mut edit = edit();
        edit.lines[0].id = None;
        edit.lines[0].article_id = None;

        let value = serde_json::to_value(InvoicePayload::from_edit(&edit)).unwrap();

        let article = &value["articles"][0];
        assert!(article.get("id").is_none());
        assert!(article.get("article_id").is_none());
    }

    #[test]
    fn decoding_ignores_transmitted_derived_values() {
        let body = json!({
            "customer_id": 12,
            "created_at": "2025-04-18",
            "articles": [{
                "description": "Consulting",
                "amount": 2,
                "unit_price": 100,
                "percent_discount": 0.1,
                "euro_discount": 5,
                "tax_rate": 0.19,
                "net_price": 999,
                "tax_amount": 999,
                "gross_price": 999
            }],
            "subtotal": 0,
            "tax_total": 0,
            "total_discount": 0,
            "total": 0
        });

        let payload: InvoicePayload = serde_json::from_value(body).unwrap();
        let edit = payload.into_edit();

        let totals = aggregate(&[edit.lines[0].item]);
        assert_eq!(edit.lines[0].item.tax_rate, dec!(0.19));
        assert_eq!(edit.lines[0].amounts().gross_price, dec!(208.25));
        assert_eq!(totals.total, dec!(208.25));
    }

    #[test]
    fn derived_fields_are_optional_when_decoding() {
        let body = json!({
            "amount": 3,
            "unit_price": 20,
            "percent_discount": 0,
            "euro_discount": 0,
            "tax_rate": 0
        });

        let article: ArticlePayload = serde_json::from_value(body).unwrap();

        assert_eq!(InvoiceLine::from(article).amounts().net_price, dec!(60));
    }

    #[test]
    fn detail_payload_recomputes_totals() {
        let body = json!({
            "invoice": {
                "id": 9,
                "invoice_number": "INV-9",
                "customer": { "id": 12 },
                "articles": [
                    { "amount": 1, "unit_price": 50, "percent_discount": 0, "euro_discount": 0, "tax_rate": 0.07 },
                    { "amount": 3, "unit_price": 20, "percent_discount": 0, "euro_discount": 0, "tax_rate": 0 }
                ],
                "subtotal": 110,
                "tax_total": 3.5,
                "total": 113.5,
                "draft": true,
                "published": false,
                "created_at": "2025-04-18T23:50:08.500297Z"
            },
            "message": "ok"
        });

        let response: InvoiceResponse = serde_json::from_value(body).unwrap();
        let invoice = response.invoice.into_invoice().unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.customer_id, 12);
        assert_eq!(
            invoice.totals,
            InvoiceTotals {
                subtotal: dec!(110),
                tax_total: dec!(3.5),
                total_discount: dec!(0),
                total: dec!(113.5),
            }
        );
    }

    #[test]
    fn detail_payload_accepts_null_articles() {
        let body = json!({
            "id": 9,
            "invoice_number": "INV-9",
            "customer": { "id": 12 },
            "articles": null,
            "subtotal": 0,
            "tax_total": 0,
            "total": 0,
            "draft": false,
            "published": true,
            "created_at": "2025-04-18T23:50:08Z"
        });

        let detail: InvoiceDetailPayload = serde_json::from_value(body).unwrap();
        let invoice = detail.into_invoice().unwrap();

        assert!(invoice.lines.is_empty());
        assert_eq!(invoice.status, InvoiceStatus::Published);
    }

    #[test]
    fn detail_payload_without_status_is_rejected() {
        let body = json!({
            "id": 9,
            "invoice_number": "INV-9",
            "customer": { "id": 12 },
            "subtotal": 0,
            "tax_total": 0,
            "total": 0,
            "draft": false,
            "published": false,
            "created_at": "2025-04-18T23:50:08Z"
        });

        let detail: InvoiceDetailPayload = serde_json::from_value(body).unwrap();

        assert_eq!(
            detail.into_invoice(),
            Err(PayloadError::UnknownStatus("INV-9".to_string()))
        );
    }

    #[test]
    fn publish_payload_carries_id_and_number() {
        let mut invoice = Invoice::draft(
            4,
            NewInvoice {
                customer_id: 1,
                invoice_number: "INV-4".to_string(),
            },
            DateTime::<Utc>::UNIX_EPOCH,
        );
        invoice.recalculate();

        let value = serde_json::to_value(PublishInvoicePayload::from(&invoice)).unwrap();

        assert_eq!(value, json!({ "invoice_id": 4, "invoice_number": "INV-4" }));
    }

    #[test]
    fn detail_payload_from_invoice_round_trips() {
        let mut invoice = Invoice::draft(
            9,
            NewInvoice {
                customer_id: 12,
                invoice_number: "INV-9".to_string(),
            },
            DateTime::<Utc>::UNIX_EPOCH,
        );
        invoice.apply_edit(edit()).unwrap();

        let detail = InvoiceDetailPayload::from(&invoice);

        assert!(detail.draft);
        assert!(!detail.published);
        assert_eq!(detail.total, dec!(208.25));
        assert_eq!(detail.into_invoice().unwrap(), invoice);
    }

    #[test]
    fn lines_payload_totals_match_aggregate() {
        let lines = edit().lines;

        let value = serde_json::to_value(LinesPayload::from_lines(&lines)).unwrap();

        assert_eq!(value["articles"][0]["gross_price"], json!(208.25));
        assert_eq!(value["subtotal"], json!(175.0));
        assert_eq!(value["total_discount"], json!(25.0));
        assert_eq!(value["total"], json!(208.25));
    }
}
