mod article;
mod customer;
mod invoice;
mod line_item;

pub use article::{Article, NewArticle};
pub use customer::{Customer, NewCustomer};
pub use invoice::{Invoice, InvoiceEdit, InvoiceError, InvoiceLine, InvoiceStatus, NewInvoice};
pub use line_item::{LineItem, LineItemError};
