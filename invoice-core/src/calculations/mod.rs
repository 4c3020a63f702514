//! Invoice arithmetic.
//!
//! Every monetary figure shown on or submitted with an invoice is derived
//! here from the raw line-item inputs. Nothing in this module rounds; use
//! [`common::round_half_up`] when a value is about to be displayed.

pub mod aggregate;
pub mod common;
pub mod line;

pub use aggregate::{InvoiceTotals, aggregate};
pub use line::{LineAmounts, compute_line};
