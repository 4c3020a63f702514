//! Plain-text tables for terminal output.
//!
//! Amounts are rounded half-up to cents here and nowhere else.

use std::fmt::Write;

use invoice_core::calculations::common::{format_money, rate_to_percent};
use invoice_core::{Article, Customer, Invoice, InvoiceLine, InvoiceTotals};

pub fn line_table(
    lines: &[InvoiceLine],
    currency: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<28} {:>8} {:>12} {:>7} {:>10} {:>6} {:>12} {:>10} {:>12}",
        "#", "Description", "Qty", "Unit price", "Disc %", "Discount", "Tax %", "Net", "Tax", "Gross"
    );
    for (index, line) in lines.iter().enumerate() {
        let item = &line.item;
        let amounts = line.amounts();
        let _ = writeln!(
            out,
            "{:>3}  {:<28} {:>8} {:>12} {:>7} {:>10} {:>6} {:>12} {:>10} {:>12}",
            index + 1,
            truncate(&line.description, 28),
            item.quantity.normalize().to_string(),
            format_money(item.unit_price, currency),
            rate_to_percent(item.percent_discount).to_string(),
            format_money(item.fixed_discount, currency),
            rate_to_percent(item.tax_rate).to_string(),
            format_money(amounts.net_price, currency),
            format_money(amounts.tax_amount, currency),
            format_money(amounts.gross_price, currency),
        );
    }
    out
}

pub fn totals_block(
    totals: &InvoiceTotals,
    currency: &str,
) -> String {
    let rows = [
        ("Subtotal", totals.subtotal),
        ("Discount", totals.total_discount),
        ("Tax", totals.tax_total),
        ("Total", totals.total),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<10}{:>14}", label, format_money(value, currency));
    }
    out
}

pub fn article_table(
    articles: &[Article],
    currency: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<44} {:>12} {:>6}", "ID", "Article", "Unit price", "Tax %");
    for article in articles {
        let _ = writeln!(
            out,
            "{:>5}  {:<44} {:>12} {:>6}",
            article.id,
            truncate(&article.label(), 44),
            format_money(article.unit_price, currency),
            rate_to_percent(article.tax_rate).to_string(),
        );
    }
    out
}

pub fn customer_table(customers: &[Customer]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<32} {:<28} {:<16}", "ID", "Name", "Email", "City");
    for customer in customers {
        let _ = writeln!(
            out,
            "{:>5}  {:<32} {:<28} {:<16}",
            customer.id,
            truncate(&customer.display_name(), 32),
            truncate(&customer.email, 28),
            truncate(&customer.city, 16),
        );
    }
    out
}

pub fn customer_detail(customer: &Customer) -> String {
    let fields = [
        ("ID", customer.id.to_string()),
        ("Company", customer.company_name.clone()),
        ("Salutation", customer.salutation.clone()),
        ("Title", customer.title.clone()),
        ("First name", customer.first_name.clone()),
        ("Last name", customer.last_name.clone()),
        ("Email", customer.email.clone()),
        ("Address", customer.address.clone()),
        ("ZIP", customer.zip.clone()),
        ("City", customer.city.clone()),
        ("Country", customer.country.clone()),
        ("Homepage", customer.homepage.clone()),
        ("UID", customer.uid.clone()),
        ("Phone", customer.phone_number.clone()),
        ("Mobile", customer.mobile_number.clone()),
    ];
    let mut out = String::new();
    for (label, value) in fields.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = writeln!(out, "{:<12}{}", label, value);
    }
    out
}

pub fn invoice_table(
    invoices: &[Invoice],
    currency: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<14} {:<10} {:>9} {:<10} {:>14}",
        "ID", "Number", "Date", "Customer", "Status", "Total"
    );
    for invoice in invoices {
        let _ = writeln!(
            out,
            "{:>5}  {:<14} {:<10} {:>9} {:<10} {:>14}",
            invoice.id,
            truncate(&invoice.invoice_number, 14),
            invoice.created_at.format("%Y-%m-%d").to_string(),
            invoice.customer_id,
            invoice.status.label(),
            format_money(invoice.totals.total, currency),
        );
    }
    out
}

pub fn invoice_detail(
    invoice: &Invoice,
    customer: Option<&Customer>,
    currency: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Invoice   {}", invoice.invoice_number);
    let _ = writeln!(out, "Date      {}", invoice.created_at.format("%Y-%m-%d"));
    match customer {
        Some(c) => {
            let _ = writeln!(out, "Customer  {} (#{})", c.display_name(), c.id);
        }
        None => {
            let _ = writeln!(out, "Customer  #{}", invoice.customer_id);
        }
    }
    let _ = writeln!(out, "Status    {}", invoice.status.label());
    out.push('\n');
    out.push_str(&line_table(&invoice.lines, currency));
    out.push('\n');
    out.push_str(&totals_block(&invoice.totals, currency));
    out
}

fn truncate(
    text: &str,
    width: usize,
) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
