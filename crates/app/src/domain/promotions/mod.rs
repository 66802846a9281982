//! Promotions

pub mod catalog;
mod errors;
pub mod ledger;
pub mod records;
mod repositories;
pub mod service;

pub use errors::{CatalogError, PromotionsServiceError, UsageLedgerError};
