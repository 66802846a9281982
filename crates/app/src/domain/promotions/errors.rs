//! Promotions service errors.

use rebate::{cart::CartError, ledger::LedgerError, stacking::StackingError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::promotions::records::PromotionRecordError;

/// The promotion catalog could not be read.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("promotion catalog unavailable")]
    Unavailable(#[source] Error),
}

impl From<Error> for CatalogError {
    fn from(error: Error) -> Self {
        Self::Unavailable(error)
    }
}

/// A usage counter could not be updated.
#[derive(Debug, Error)]
pub enum UsageLedgerError {
    #[error("usage ledger unavailable")]
    Unavailable(#[source] Error),

    #[error(transparent)]
    InMemory(#[from] LedgerError),
}

impl From<Error> for UsageLedgerError {
    fn from(error: Error) -> Self {
        Self::Unavailable(error)
    }
}

#[derive(Debug, Error)]
pub enum PromotionsServiceError {
    #[error("promotion already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("invalid cart")]
    Cart(#[from] CartError),

    #[error("could not apply promotions")]
    Stacking(#[from] StackingError),

    #[error("could not store promotion")]
    Record(#[from] PromotionRecordError),

    #[error("promotion catalog unavailable")]
    Catalog(#[from] CatalogError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for PromotionsServiceError {
    fn from(error: Error) -> Self {
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}
