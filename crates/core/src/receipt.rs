//! Receipt

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::Cart,
    discounts::percent_points,
    pricing::TotalPriceError,
    stacking::DiscountResult,
};

/// Errors that can occur when building a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error calculating a subtotal or line total.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// The discount is in a different currency from the cart (discount, cart).
    #[error("discount currency {0} does not match cart currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The discount exceeds the subtotal.
    #[error("discount exceeds subtotal")]
    DiscountExceedsSubtotal,

    /// IO error
    #[error("IO error")]
    IO,
}

/// Final receipt for a quoted cart.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    /// Total cost before any promotions
    subtotal: Money<'a, Currency>,

    /// Promotions applied and their total
    discount: DiscountResult<'a>,

    /// Amount payable after promotions
    total: Money<'a, Currency>,
}

impl<'a> Receipt<'a> {
    /// Build a receipt for `cart` with the resolved `discount`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if the subtotal cannot be computed, the
    /// discount is in another currency, or the discount exceeds the subtotal.
    pub fn new(cart: &Cart<'a>, discount: DiscountResult<'a>) -> Result<Self, ReceiptError> {
        let subtotal = cart.subtotal()?;
        let amount = discount.discount_amount();

        if amount.currency() != cart.currency() {
            return Err(ReceiptError::CurrencyMismatch(
                amount.currency().iso_alpha_code,
                cart.currency().iso_alpha_code,
            ));
        }

        let total = subtotal
            .to_minor_units()
            .checked_sub(amount.to_minor_units())
            .filter(|total| *total >= 0)
            .ok_or(ReceiptError::DiscountExceedsSubtotal)?;

        Ok(Self {
            subtotal,
            discount,
            total: Money::from_minor(total, cart.currency()),
        })
    }

    /// Total cost before any promotions
    #[must_use]
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Total amount payable
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Promotions applied to the cart
    #[must_use]
    pub fn discount(&self) -> &DiscountResult<'a> {
        &self.discount
    }

    /// Savings as a share of the subtotal.
    #[must_use]
    pub fn savings_percent(&self) -> Percentage {
        let subtotal = Decimal::from(self.subtotal.to_minor_units());

        if subtotal.is_zero() {
            return Percentage::from(Decimal::ZERO);
        }

        let savings = Decimal::from(self.discount.discount_amount().to_minor_units());

        Percentage::from(savings / subtotal)
    }

    /// Prints the receipt: cart lines, applied promotions and the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if a line total overflows or the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write, cart: &Cart<'_>) -> Result<(), ReceiptError> {
        let mut lines = Builder::default();

        lines.push_record(["Product", "Category", "Qty", "Unit Price", "Line Total"]);

        for item in cart.iter() {
            lines.push_record([
                item.product().to_string(),
                item.category().to_string(),
                item.quantity().to_string(),
                item.unit_price().to_string(),
                item.line_total()?.to_string(),
            ]);
        }

        let mut lines = lines.build();

        lines
            .with(Style::modern_rounded())
            .modify(Rows::first(), Color::BOLD)
            .modify(Columns::new(2..5), Alignment::right());

        writeln!(out, "\n{lines}").map_err(|_err| ReceiptError::IO)?;

        if !self.discount.is_empty() {
            let mut promotions = Builder::default();

            promotions.push_record(["Promotion", "Savings"]);

            for applied in self.discount.applied_promotions() {
                promotions.push_record([
                    applied.name().to_string(),
                    format!("-{}", applied.amount()),
                ]);
            }

            let mut promotions = promotions.build();

            promotions
                .with(Style::modern_rounded())
                .modify(Rows::first(), Color::BOLD)
                .modify(Columns::new(1..2), Alignment::right());

            writeln!(out, "{promotions}").map_err(|_err| ReceiptError::IO)?;
        }

        let savings_points = percent_points(self.savings_percent());

        writeln!(out, " Subtotal: {}", self.subtotal).map_err(|_err| ReceiptError::IO)?;
        writeln!(
            out,
            " Savings:  ({savings_points:.2}%) {}",
            self.discount.discount_amount()
        )
        .map_err(|_err| ReceiptError::IO)?;
        writeln!(out, " Total:    {}", self.total).map_err(|_err| ReceiptError::IO)
    }
}
