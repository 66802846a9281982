//! Cart Fixtures

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    cart::Cart,
    discounts::percent_from_points,
    fixtures::FixtureError,
    ids::{CustomerId, ProductId},
    items::CartItem,
    pricing::currency_from_code,
};

/// Cart fixture file
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Cart currency code (e.g., "GBP")
    pub currency: String,

    /// Customer checking out, if known
    #[serde(default)]
    pub customer: Option<CustomerId>,

    /// Evaluation time; defaults to the current time
    #[serde(default)]
    pub now: Option<Timestamp>,

    /// Subtotal claimed by the caller (e.g., "500.00 GBP")
    #[serde(default)]
    pub claimed_subtotal: Option<String>,

    /// Cart lines
    pub items: Vec<CartItemFixture>,
}

/// Cart line fixture
#[derive(Debug, Deserialize)]
pub struct CartItemFixture {
    /// Product ID
    pub product: ProductId,

    /// Product category
    pub category: String,

    /// Units in the line
    pub quantity: u32,

    /// Unit price (e.g., "2.99 GBP")
    pub price: String,
}

impl CartFixture {
    /// Build a validated cart from the fixture lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency is unknown, a price cannot be parsed,
    /// or the resulting cart fails validation.
    pub fn to_cart<'a>(&self) -> Result<Cart<'a>, FixtureError> {
        let currency = currency_from_code(&self.currency)
            .ok_or_else(|| FixtureError::UnknownCurrency(self.currency.clone()))?;

        let items = self
            .items
            .iter()
            .map(|item| {
                let (minor, item_currency) = parse_price(&item.price)?;

                Ok(CartItem::new(
                    item.product.clone(),
                    item.category.clone(),
                    item.quantity,
                    Money::from_minor(minor, item_currency),
                ))
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        Ok(Cart::with_items(items, currency)?)
    }

    /// Parse the claimed subtotal, if one was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the price cannot be parsed.
    pub fn claimed_subtotal<'a>(&self) -> Result<Option<Money<'a, Currency>>, FixtureError> {
        self.claimed_subtotal
            .as_deref()
            .map(|price| {
                let (minor, currency) = parse_price(price)?;

                Ok(Money::from_minor(minor, currency))
            })
            .transpose()
    }
}

/// Parse price string (e.g., "2.99 GBP") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = currency_from_code(currency_code)
        .ok_or_else(|| FixtureError::UnknownCurrency((*currency_code).to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::from(10_i64.pow(currency.exponent)))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    Ok((minor_units, currency))
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "15%" for 15%
/// - Decimal format: "0.15" for 15%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a decimal.
pub fn parse_percentage(s: &str) -> Result<Percentage, FixtureError> {
    let trimmed = s.trim();

    if let Some(points) = trimmed.strip_suffix('%') {
        let points = points
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        Ok(percent_from_points(points))
    } else {
        let fraction = trimmed
            .parse::<Decimal>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(fraction))
    }
}
