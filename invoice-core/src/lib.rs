pub mod calculations;
pub mod db;
pub mod models;
pub mod payload;

pub use calculations::{InvoiceTotals, LineAmounts, aggregate, compute_line};
pub use db::repository::{InvoiceRepository, RepositoryError};
pub use models::*;
