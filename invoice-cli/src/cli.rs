use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use invoice_core::{Customer, NewCustomer};

use crate::config::Settings;

/// Invoice line calculator and small invoicing book.
///
/// Computes line amounts and invoice totals from CSV files, and keeps
/// customers, an article catalog and invoices in a database.
#[derive(Debug, Parser)]
#[command(name = "invoicer", version)]
pub struct Cli {
    /// TOML settings file (backend, database, currency_symbol, log_level).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `invoices.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Currency symbol printed in front of amounts.
    #[arg(long, global = true)]
    pub currency: Option<String>,

    /// Log filter, e.g. `warn` or `invoice_core=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The settings given on the command line.
    pub fn settings(&self) -> Settings {
        Settings {
            backend: self.backend.clone(),
            database: self.db.clone(),
            currency_symbol: self.currency.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print line amounts and totals for a CSV of invoice lines.
    ///
    /// Columns: description, quantity, unit_price, percent_discount,
    /// fixed_discount, tax_rate and optionally ean. Rates are fractions.
    Compute {
        file: PathBuf,

        /// Print the API payload instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Manage customers.
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// Browse the article catalog loaded by `invoice-data-loader`.
    #[command(subcommand)]
    Article(ArticleCommand),

    /// Manage invoices.
    #[command(subcommand)]
    Invoice(InvoiceCommand),
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    Add(CustomerFields),
    List,
    Show { id: i64 },
    /// Change the given fields, keeping the others.
    Update {
        id: i64,
        #[command(flatten)]
        fields: CustomerFields,
    },
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ArticleCommand {
    List,
}

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Create an empty draft.
    New {
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        number: String,
        /// Print the `POST /invoices` body instead of a message.
        #[arg(long)]
        json: bool,
    },
    List,
    Show {
        id: i64,
        /// Print the `GET /invoices/{id}` response.
        #[arg(long)]
        json: bool,
    },
    /// Replace the lines of a draft with those of a CSV file, or with the
    /// articles of a `PUT /invoices/{id}` body.
    Edit {
        id: i64,
        #[arg(long, conflicts_with = "payload", required_unless_present = "payload")]
        lines: Option<PathBuf>,
        /// JSON body of `PUT /invoices/{id}`; its derived values are ignored.
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Move the invoice to another customer.
        #[arg(long, conflicts_with = "payload")]
        customer: Option<i64>,
        /// Invoice date, YYYY-MM-DD.
        #[arg(long, conflicts_with = "payload")]
        date: Option<NaiveDate>,
        /// Print the `PUT /invoices/{id}` body that was saved.
        #[arg(long)]
        json: bool,
    },
    /// Publish a draft. Published invoices can no longer be edited.
    Publish {
        id: i64,
        /// Print the `PUT /invoices/publish/{id}` body.
        #[arg(long)]
        json: bool,
    },
    /// Recreate an invoice from the output of `invoice show --json`.
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Default, Args)]
pub struct CustomerFields {
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub zip: Option<String>,
    #[arg(long)]
    pub homepage: Option<String>,
    /// VAT identification number.
    #[arg(long)]
    pub uid: Option<String>,
    #[arg(long)]
    pub salutation: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub mobile: Option<String>,
}

impl CustomerFields {
    pub fn into_new(self) -> NewCustomer {
        NewCustomer {
            company_name: self.company.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            zip: self.zip.unwrap_or_default(),
            homepage: self.homepage.unwrap_or_default(),
            uid: self.uid.unwrap_or_default(),
            salutation: self.salutation.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            phone_number: self.phone.unwrap_or_default(),
            mobile_number: self.mobile.unwrap_or_default(),
        }
    }

    /// Overwrites the fields that were given.
    pub fn apply_to(
        self,
        customer: &mut Customer,
    ) {
        let targets = [
            (self.company, &mut customer.company_name),
            (self.first_name, &mut customer.first_name),
            (self.last_name, &mut customer.last_name),
            (self.email, &mut customer.email),
            (self.address, &mut customer.address),
            (self.city, &mut customer.city),
            (self.country, &mut customer.country),
            (self.zip, &mut customer.zip),
            (self.homepage, &mut customer.homepage),
            (self.uid, &mut customer.uid),
            (self.salutation, &mut customer.salutation),
            (self.title, &mut customer.title),
            (self.phone, &mut customer.phone_number),
            (self.mobile, &mut customer.mobile_number),
        ];
        for (value, field) in targets {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.country.is_none()
            && self.zip.is_none()
            && self.homepage.is_none()
            && self.uid.is_none()
            && self.salutation.is_none()
            && self.title.is_none()
            && self.phone.is_none()
            && self.mobile.is_none()
    }
}
