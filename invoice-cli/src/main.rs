use anyhow::{Context, bail};
use clap::Parser;
use invoice_core::NewInvoice;
use tracing::debug;

use invoice_cli::app::{self, EditOptions};
use invoice_cli::cli::{ArticleCommand, Cli, Command, CustomerCommand, InvoiceCommand};
use invoice_cli::config::Settings;
use invoice_cli::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let file_settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let settings = cli.settings().layered_over(file_settings);

    if !logging::env_filter_is_set() {
        logging::set_log_level(settings.log_level())?;
    }
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let currency = settings.currency_symbol().to_string();
    let registry = app::build_registry();
    let db_config = settings.db_config();

    let output = match cli.command {
        Command::Compute { file, json } => {
            let records = app::read_line_records(&file)?;
            let catalog = if app::needs_catalog(&records) {
                debug!("loading catalog from {} backend", db_config.backend);
                let repo = registry.create(&db_config).await?;
                repo.list_articles()
                    .await
                    .context("Failed to load article catalog")?
            } else {
                Vec::new()
            };
            app::compute(&records, &catalog, &currency, json)?
        }
        Command::Customer(command) => {
            debug!("connecting to {} backend", db_config.backend);
            let repo = registry.create(&db_config).await?;
            match command {
                CustomerCommand::Add(fields) => app::add_customer(&*repo, fields).await?,
                CustomerCommand::List => app::list_customers(&*repo).await?,
                CustomerCommand::Show { id } => app::show_customer(&*repo, id).await?,
                CustomerCommand::Update { id, fields } => {
                    app::update_customer(&*repo, id, fields).await?
                }
                CustomerCommand::Delete { id } => app::delete_customer(&*repo, id).await?,
            }
        }
        Command::Article(ArticleCommand::List) => {
            debug!("connecting to {} backend", db_config.backend);
            let repo = registry.create(&db_config).await?;
            app::list_articles(&*repo, &currency).await?
        }
        Command::Invoice(command) => {
            debug!("connecting to {} backend", db_config.backend);
            let repo = registry.create(&db_config).await?;
            match command {
                InvoiceCommand::New {
                    customer,
                    number,
                    json,
                } => {
                    let new = NewInvoice {
                        customer_id: customer,
                        invoice_number: number,
                    };
                    app::new_invoice(&*repo, new, json).await?
                }
                InvoiceCommand::List => app::list_invoices(&*repo, &currency).await?,
                InvoiceCommand::Show { id, json } => {
                    app::show_invoice(&*repo, id, &currency, json).await?
                }
                InvoiceCommand::Edit {
                    id,
                    lines,
                    payload,
                    customer,
                    date,
                    json,
                } => match (lines, payload) {
                    (_, Some(payload)) => {
                        app::edit_from_payload(&*repo, id, &payload, &currency, json).await?
                    }
                    (Some(lines), None) => {
                        let records = app::read_line_records(&lines)?;
                        let options = EditOptions {
                            customer_id: customer,
                            invoice_date: date,
                            json,
                        };
                        app::edit_lines(&*repo, id, &records, options, &currency).await?
                    }
                    (None, None) => bail!("invoice edit needs --lines or --payload"),
                },
                InvoiceCommand::Publish { id, json } => app::publish(&*repo, id, json).await?,
                InvoiceCommand::Import { file } => app::import_invoice(&*repo, &file).await?,
            }
        }
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
