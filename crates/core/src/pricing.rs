//! Prices

use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use thiserror::Error;

use crate::items::CartItem;

/// Errors that can occur while calculating total price.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalPriceError {
    /// A line total or running total no longer fits in minor units.
    #[error("price arithmetic overflowed")]
    Overflow,

    /// A line was priced in a different currency (line currency, expected currency).
    #[error("line priced in {0}, expected {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Calculates `Σ quantity × unit_price` over the given lines.
///
/// An empty slice totals to zero in `currency`.
///
/// # Errors
///
/// - [`TotalPriceError::Overflow`]: a line or the running total overflowed.
/// - [`TotalPriceError::CurrencyMismatch`]: a line is not priced in `currency`.
pub fn total_price<'a, 'i>(
    items: impl IntoIterator<Item = &'i CartItem<'a>>,
    currency: &'static Currency,
) -> Result<Money<'a, Currency>, TotalPriceError>
where
    'a: 'i,
{
    let minor = items.into_iter().try_fold(0_i64, |acc, item| {
        let item_currency = item.unit_price().currency();

        if item_currency != currency {
            return Err(TotalPriceError::CurrencyMismatch(
                item_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }

        acc.checked_add(item.line_total()?.to_minor_units())
            .ok_or(TotalPriceError::Overflow)
    })?;

    Ok(Money::from_minor(minor, currency))
}

/// Look up one of the supported ISO currencies by its alpha code.
pub fn currency_from_code(code: &str) -> Option<&'static Currency> {
    match code.trim() {
        "GBP" => Some(GBP),
        "USD" => Some(USD),
        "EUR" => Some(EUR),
        _ => None,
    }
}
