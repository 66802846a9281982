//! Promotions

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    ids::{BusinessId, PromotionId},
    promotions::{
        kind::PromotionKind,
        status::{ActiveWindow, PromotionStatus},
        usage::UsageLimits,
    },
    scope::PromotionScope,
};

pub mod kind;
pub mod status;
pub mod usage;

/// Errors raised while constructing a promotion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromotionError {
    /// The promotion kind is not one the engine understands.
    #[error("unrecognised promotion kind: {0}")]
    UnknownKind(String),

    /// Buy-X-get-Y quantities must both be at least one.
    #[error("buy and get quantities must be at least 1")]
    InvalidQuantity,

    /// A percentage was negative, or a buy-X-get-Y discount exceeded 100%.
    #[error("percentage out of range")]
    PercentOutOfRange,

    /// A monetary field was negative (field name).
    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),

    /// A monetary field is in a different currency from the promotion (expected, found).
    #[error("currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The window ends before it starts.
    #[error("promotion ends before it starts")]
    InvalidWindow,
}

/// A promotion definition, as read from the catalog.
///
/// Instances are only created through [`PromotionBuilder`], so every
/// promotion in the engine has non-negative amounts in a single currency
/// and a well-formed window.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion<'a> {
    id: PromotionId,
    business: BusinessId,
    name: String,
    kind: PromotionKind<'a>,
    min_order_amount: Money<'a, Currency>,
    max_discount: Option<Money<'a, Currency>>,
    usage: UsageLimits,
    window: ActiveWindow,
    is_active: bool,
    scope: PromotionScope,
    currency: &'static Currency,
}

impl<'a> Promotion<'a> {
    /// Start building a promotion.
    pub fn builder(
        id: impl Into<PromotionId>,
        business: impl Into<BusinessId>,
        name: impl Into<String>,
        kind: PromotionKind<'a>,
        currency: &'static Currency,
    ) -> PromotionBuilder<'a> {
        PromotionBuilder {
            id: id.into(),
            business: business.into(),
            name: name.into(),
            kind,
            min_order_amount: Money::from_minor(0, currency),
            max_discount: None,
            usage: UsageLimits::unlimited(),
            window: ActiveWindow::open(),
            is_active: true,
            scope: PromotionScope::All,
            currency,
        }
    }

    /// Promotion ID
    pub fn id(&self) -> &PromotionId {
        &self.id
    }

    /// Owning business
    pub fn business(&self) -> &BusinessId {
        &self.business
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and payload
    pub fn kind(&self) -> &PromotionKind<'a> {
        &self.kind
    }

    /// Order subtotal required before this promotion applies.
    pub fn min_order_amount(&self) -> Money<'a, Currency> {
        self.min_order_amount
    }

    /// Cap on this promotion's contribution
    pub fn max_discount(&self) -> Option<Money<'a, Currency>> {
        self.max_discount
    }

    /// Usage limits and global count
    pub fn usage(&self) -> &UsageLimits {
        &self.usage
    }

    /// Date window
    pub fn window(&self) -> &ActiveWindow {
        &self.window
    }

    /// Manual pause switch; `false` means paused.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Lines this promotion may discount
    pub fn scope(&self) -> &PromotionScope {
        &self.scope
    }

    /// Currency of every amount on this promotion
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Derived status at `now`.
    pub fn status_at(&self, now: Timestamp) -> PromotionStatus {
        PromotionStatus::derive(self.is_active, &self.window, now)
    }

    /// Whether an order of `subtotal` clears the minimum order amount.
    ///
    /// Subtotals in another currency never qualify.
    pub fn meets_minimum(&self, subtotal: Money<'_, Currency>) -> bool {
        subtotal.currency() == self.currency
            && subtotal.to_minor_units() >= self.min_order_amount.to_minor_units()
    }
}

/// Builder for [`Promotion`]; validation happens in [`PromotionBuilder::build`].
#[derive(Debug, Clone)]
pub struct PromotionBuilder<'a> {
    id: PromotionId,
    business: BusinessId,
    name: String,
    kind: PromotionKind<'a>,
    min_order_amount: Money<'a, Currency>,
    max_discount: Option<Money<'a, Currency>>,
    usage: UsageLimits,
    window: ActiveWindow,
    is_active: bool,
    scope: PromotionScope,
    currency: &'static Currency,
}

impl<'a> PromotionBuilder<'a> {
    /// Set the minimum order amount.
    #[must_use]
    pub fn min_order_amount(mut self, amount: Money<'a, Currency>) -> Self {
        self.min_order_amount = amount;
        self
    }

    /// Set or clear the discount cap.
    #[must_use]
    pub fn max_discount(mut self, cap: Option<Money<'a, Currency>>) -> Self {
        self.max_discount = cap;
        self
    }

    /// Set the usage limits.
    #[must_use]
    pub fn usage(mut self, usage: UsageLimits) -> Self {
        self.usage = usage;
        self
    }

    /// Set the date window.
    #[must_use]
    pub fn window(mut self, window: ActiveWindow) -> Self {
        self.window = window;
        self
    }

    /// Set the pause switch.
    #[must_use]
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Set the scope.
    #[must_use]
    pub fn scope(mut self, scope: PromotionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Validate and build the promotion.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if an amount is negative or in a foreign
    /// currency, a percentage is out of range, or the window is reversed.
    pub fn build(self) -> Result<Promotion<'a>, PromotionError> {
        match self.kind {
            PromotionKind::Percentage(percent) => {
                if percent * Decimal::ONE < Decimal::ZERO {
                    return Err(PromotionError::PercentOutOfRange);
                }
            }
            PromotionKind::Fixed(amount) => self.check_amount("value", amount)?,
            PromotionKind::Threshold(amount) => self.check_amount("value", amount)?,
            PromotionKind::Bundle(price) => self.check_amount("bundle_price", price)?,
            PromotionKind::BuyXGetY(_) => {}
        }

        self.check_amount("min_order_amount", self.min_order_amount)?;

        if let Some(cap) = self.max_discount {
            self.check_amount("max_discount", cap)?;
        }

        if !self.window.is_well_formed() {
            return Err(PromotionError::InvalidWindow);
        }

        Ok(Promotion {
            id: self.id,
            business: self.business,
            name: self.name,
            kind: self.kind,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage: self.usage,
            window: self.window,
            is_active: self.is_active,
            scope: self.scope,
            currency: self.currency,
        })
    }

    fn check_amount(
        &self,
        field: &'static str,
        amount: Money<'_, Currency>,
    ) -> Result<(), PromotionError> {
        if amount.currency() != self.currency {
            return Err(PromotionError::CurrencyMismatch(
                self.currency.iso_alpha_code,
                amount.currency().iso_alpha_code,
            ));
        }

        if amount.to_minor_units() < 0 {
            return Err(PromotionError::NegativeAmount(field));
        }

        Ok(())
    }
}
