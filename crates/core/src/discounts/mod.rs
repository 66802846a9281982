//! Discount Calculation
//!
//! Turns a single promotion and the lines its scope matched into a candidate
//! discount. All arithmetic happens in minor units; percentage results are
//! rounded half away from zero.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    pricing::TotalPriceError,
    promotions::{
        Promotion,
        kind::{BuyXGetY, PromotionKind},
    },
    scope::{PromotionScope, ScopeMatch},
};

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// The promotion and the cart are in different currencies (promotion, cart).
    #[error("promotion currency {0} does not match cart currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The eligible subtotal could not be computed.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// # Errors
///
/// Returns an error if:
/// - The percentage calculation overflows or cannot be safely represented (`DiscountError::PercentConversion`).
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage crate doesn't actually expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Build a [`Percentage`] from percentage points, so `10` becomes 10%.
pub fn percent_from_points(points: Decimal) -> Percentage {
    Percentage::from(points / Decimal::ONE_HUNDRED)
}

/// Express a [`Percentage`] in percentage points, so 10% becomes `10`.
pub fn percent_points(percent: Percentage) -> Decimal {
    percent * Decimal::ONE_HUNDRED
}

/// Compute the candidate discount of `promotion` over the lines it matched.
///
/// `overall_subtotal` is the whole cart's subtotal and is used as the eligible
/// subtotal for promotions scoped to every line. The result is capped by the
/// promotion's `max_discount` and never negative. Percentage, bundle and
/// buy-x-get-y amounts never exceed the eligible subtotal; fixed and threshold
/// amounts stay flat and are only bounded later by the cart subtotal. The
/// minimum order gate is not checked here.
///
/// # Errors
///
/// Returns [`DiscountError::CurrencyMismatch`] if the promotion is priced in a
/// different currency from the cart, or [`DiscountError::PercentConversion`] if
/// percentage arithmetic overflows.
pub fn compute_discount<'a>(
    promotion: &Promotion<'a>,
    matched: &ScopeMatch<'_, 'a>,
    overall_subtotal: Money<'a, Currency>,
) -> Result<Money<'a, Currency>, DiscountError> {
    let currency = promotion.currency();

    for subtotal in [matched.subtotal(), overall_subtotal] {
        if subtotal.currency() != currency {
            return Err(DiscountError::CurrencyMismatch(
                currency.iso_alpha_code,
                subtotal.currency().iso_alpha_code,
            ));
        }
    }

    let eligible = match promotion.scope() {
        PromotionScope::All => overall_subtotal.to_minor_units(),
        PromotionScope::Category(_) | PromotionScope::Products(_) => {
            matched.subtotal().to_minor_units()
        }
    };

    if eligible <= 0 {
        return Ok(Money::from_minor(0, currency));
    }

    let raw = match promotion.kind() {
        PromotionKind::Percentage(percent) => percent_of_minor(percent, eligible)?.min(eligible),
        PromotionKind::Fixed(amount) | PromotionKind::Threshold(amount) => amount.to_minor_units(),
        PromotionKind::BuyXGetY(bogo) => {
            buy_x_get_y_minor(bogo, eligible, matched.quantity())?.min(eligible)
        }
        PromotionKind::Bundle(price) => eligible.saturating_sub(price.to_minor_units()),
    };

    let capped = promotion
        .max_discount()
        .map_or(raw, |cap| raw.min(cap.to_minor_units()));

    Ok(Money::from_minor(capped.max(0), currency))
}

/// Free units (`⌊quantity / group⌋ × get`) at the average eligible unit price,
/// discounted by the get percentage.
fn buy_x_get_y_minor(
    bogo: &BuyXGetY,
    eligible: i64,
    quantity: u64,
) -> Result<i64, DiscountError> {
    let free_units = (quantity / bogo.group_size()).saturating_mul(u64::from(bogo.get_qty()));

    if free_units == 0 {
        return Ok(0);
    }

    let free_value = Decimal::from(free_units)
        .checked_mul(Decimal::from(eligible))
        .and_then(|value| value.checked_div(Decimal::from(quantity)))
        .ok_or(DiscountError::PercentConversion)?;

    (bogo.get_discount() * Decimal::ONE)
        .checked_mul(free_value)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
