//! Cart

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    items::CartItem,
    pricing::{TotalPriceError, total_price},
};

/// Largest disagreement, in minor units, tolerated between a caller-supplied
/// subtotal and the recomputed one.
pub const SUBTOTAL_EPSILON_MINOR: i64 = 1;

/// Errors raised while validating a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// A line has a zero quantity (line index).
    #[error("item {0} has a zero quantity")]
    ZeroQuantity(usize),

    /// A line has a negative unit price (line index).
    #[error("item {0} has a negative unit price")]
    NegativePrice(usize),

    /// A line's currency differs from the cart currency (index, item currency, cart currency).
    #[error("item {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// A caller-supplied subtotal disagrees with the lines (claimed, computed), in minor units.
    #[error("claimed subtotal {0} does not match computed subtotal {1}")]
    SubtotalMismatch(i64, i64),

    /// The subtotal could not be computed.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// A validated set of priced lines in a single currency.
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    items: Vec<CartItem<'a>>,
    currency: &'static Currency,
}

impl<'a> Cart<'a> {
    /// Create an empty cart.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
        }
    }

    /// Create a new cart with the given lines.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if a line has a zero quantity, a negative price,
    /// a foreign currency, or if the subtotal overflows.
    pub fn with_items(
        items: impl Into<Vec<CartItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let items = items.into();

        items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| validate_item(i, item, currency))?;

        let cart = Cart { items, currency };

        cart.subtotal()?;

        Ok(cart)
    }

    /// Add a line to the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the line is invalid for this cart.
    pub fn push(&mut self, item: CartItem<'a>) -> Result<(), CartError> {
        validate_item(self.items.len(), &item, self.currency)?;

        self.items.push(item);

        if let Err(error) = self.subtotal() {
            self.items.pop();

            return Err(error.into());
        }

        Ok(())
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`TotalPriceError`] if the arithmetic overflows.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        total_price(&self.items, self.currency)
    }

    /// Check a caller-supplied subtotal against the lines and return the recomputed one.
    ///
    /// Differences within [`SUBTOTAL_EPSILON_MINOR`] are accepted; the recomputed
    /// subtotal is always the one returned.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SubtotalMismatch`] if the claim is further off than
    /// the epsilon, or a currency mismatch if it is in another currency.
    pub fn verified_subtotal(
        &self,
        claimed: Option<Money<'_, Currency>>,
    ) -> Result<Money<'a, Currency>, CartError> {
        let computed = self.subtotal()?;

        let Some(claimed) = claimed else {
            return Ok(computed);
        };

        if claimed.currency() != self.currency {
            return Err(CartError::CurrencyMismatch(
                self.items.len(),
                claimed.currency().iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let claimed_minor = claimed.to_minor_units();
        let computed_minor = computed.to_minor_units();

        let within_epsilon = claimed_minor
            .checked_sub(computed_minor)
            .is_some_and(|diff| diff.abs() <= SUBTOTAL_EPSILON_MINOR);

        if within_epsilon {
            Ok(computed)
        } else {
            Err(CartError::SubtotalMismatch(claimed_minor, computed_minor))
        }
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem<'a>> {
        self.items.iter()
    }

    /// Get the number of lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

fn validate_item(
    index: usize,
    item: &CartItem<'_>,
    currency: &'static Currency,
) -> Result<(), CartError> {
    let item_currency = item.unit_price().currency();

    if item_currency != currency {
        return Err(CartError::CurrencyMismatch(
            index,
            item_currency.iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    if item.quantity() == 0 {
        return Err(CartError::ZeroQuantity(index));
    }

    if item.unit_price().to_minor_units() < 0 {
        return Err(CartError::NegativePrice(index));
    }

    Ok(())
}
