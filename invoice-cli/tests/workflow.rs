//! End-to-end runs against a SQLite file, reopening it between steps the way
//! separate `invoicer` invocations do.

use std::io::Write;

use invoice_cli::app::{self, EditOptions};
use invoice_cli::cli::CustomerFields;
use invoice_cli::config::Settings;
use invoice_core::{InvoiceRepository, InvoiceStatus, NewInvoice};
use invoice_data::{ArticleCatalogLoader, LineItemCsv};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

async fn open(settings: &Settings) -> Box<dyn InvoiceRepository> {
    app::build_registry()
        .create(&settings.db_config())
        .await
        .expect("Failed to open database")
}

#[tokio::test]
async fn invoice_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        database: Some(dir.path().join("invoices.db").display().to_string()),
        ..Default::default()
    };

    {
        let repo = open(&settings).await;
        let catalog = "ean,description,unit_price,tax_rate\n4006381333931,Pencil HB,1.20,0.19\n";
        let records = ArticleCatalogLoader::parse(catalog.as_bytes()).unwrap();
        ArticleCatalogLoader::load(&*repo, &records).await.unwrap();
        app::add_customer(
            &*repo,
            CustomerFields {
                company: Some("Acme GmbH".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        app::new_invoice(
            &*repo,
            NewInvoice {
                customer_id: 1,
                invoice_number: "2025-001".to_string(),
            },
            false,
        )
        .await
        .unwrap();
    }

    {
        let repo = open(&settings).await;
        let mut lines = tempfile::NamedTempFile::new().unwrap();
        write!(
            lines,
            "description,quantity,unit_price,percent_discount,fixed_discount,tax_rate,ean\n\
             Consulting,2,100,0.10,5,0.19,\n\
             ,12,1.20,0.05,,0.19,4006381333931\n"
        )
        .unwrap();
        let records = app::read_line_records(lines.path()).unwrap();
        app::edit_lines(&*repo, 1, &records, EditOptions::default(), settings.currency_symbol())
            .await
            .unwrap();
        app::publish(&*repo, 1, false).await.unwrap();
    }

    let repo = open(&settings).await;
    let invoice = repo.get_invoice(1).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Published);
    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(invoice.lines[1].description, "Pencil HB");
    assert_eq!(invoice.totals.subtotal, dec!(188.68));
    assert_eq!(invoice.totals.tax_total, dec!(35.8492));
    assert_eq!(invoice.totals.total, dec!(224.5292));

    let shown = app::show_invoice(&*repo, 1, "€", false).await.unwrap();
    assert!(shown.contains("Status    Published"));
    assert!(shown.contains("Total            €224.53"));
}

#[tokio::test]
async fn compute_needs_no_database() {
    let csv = "description,quantity,unit_price,percent_discount,fixed_discount,tax_rate\n\
               Consulting,2,100,0.10,5,0.19\n";
    let records = LineItemCsv::parse(csv.as_bytes()).unwrap();

    let output = app::compute(&records, &[], "€", false).unwrap();

    assert!(output.contains("Subtotal         €175.00"));
    assert!(output.contains("Total            €208.25"));
}
