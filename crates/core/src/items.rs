//! Items

use rusty_money::{Money, iso::Currency};

use crate::{ids::ProductId, pricing::TotalPriceError};

/// A priced cart line.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem<'a> {
    product: ProductId,
    category: String,
    quantity: u32,
    unit_price: Money<'a, Currency>,
}

impl<'a> CartItem<'a> {
    /// Creates a new cart line.
    ///
    /// Quantity and price are validated when the line is added to a [`Cart`](crate::cart::Cart).
    pub fn new(
        product: impl Into<ProductId>,
        category: impl Into<String>,
        quantity: u32,
        unit_price: Money<'a, Currency>,
    ) -> Self {
        Self {
            product: product.into(),
            category: category.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the product of the line
    pub fn product(&self) -> &ProductId {
        &self.product
    }

    /// Returns the category of the line
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the number of units on the line
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the price of a single unit
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Returns `quantity × unit_price`.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if the multiplication overflows.
    pub fn line_total(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        let minor = self
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(TotalPriceError::Overflow)?;

        Ok(Money::from_minor(minor, self.unit_price.currency()))
    }
}
