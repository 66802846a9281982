//! Promotion Stacking
//!
//! Applies every eligible promotion to a cart, flat reductions first, and
//! clamps the accumulated discount to the subtotal.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cart::{Cart, CartError},
    discounts::{DiscountError, compute_discount, percent_points},
    ids::PromotionId,
    promotions::{Promotion, kind::PromotionKind},
};

/// Errors raised before any promotion is evaluated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackingError {
    /// The subtotal is in a different currency from the cart (subtotal, cart).
    #[error("subtotal currency {0} does not match cart currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The subtotal disagrees with the cart's lines, or cannot be recomputed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// One promotion's contribution to a [`DiscountResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPromotion<'a> {
    promotion_id: PromotionId,
    name: String,
    amount: Money<'a, Currency>,
}

impl<'a> AppliedPromotion<'a> {
    /// Promotion that was applied
    pub fn promotion_id(&self) -> &PromotionId {
        &self.promotion_id
    }

    /// Promotion name at the time of evaluation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Amount this promotion took off
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }
}

/// Total discount for a cart and the promotions that make it up, in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountResult<'a> {
    discount_amount: Money<'a, Currency>,
    applied_promotions: Vec<AppliedPromotion<'a>>,
}

impl<'a> DiscountResult<'a> {
    /// A result with no discount.
    pub fn none(currency: &'static Currency) -> Self {
        Self {
            discount_amount: Money::from_minor(0, currency),
            applied_promotions: Vec::new(),
        }
    }

    /// Sum of every applied amount; never more than the subtotal.
    pub fn discount_amount(&self) -> Money<'a, Currency> {
        self.discount_amount
    }

    /// Applied promotions in the order they were applied
    pub fn applied_promotions(&self) -> &[AppliedPromotion<'a>] {
        &self.applied_promotions
    }

    /// IDs of the applied promotions, ready to hand to a usage ledger.
    pub fn promotion_ids(&self) -> impl Iterator<Item = &PromotionId> {
        self.applied_promotions
            .iter()
            .map(AppliedPromotion::promotion_id)
    }

    /// Whether nothing was applied.
    pub fn is_empty(&self) -> bool {
        self.applied_promotions.is_empty()
    }
}

/// Apply `promotions` to `cart`.
///
/// `subtotal` is checked against the cart's lines and the recomputed value is
/// used from then on. Promotions whose minimum order amount is above it are
/// dropped. The rest are applied flat kinds first, then percentages. Flat
/// kinds rank by the amount they take off, percentages by their points; ties
/// go to the lower ID. Every promotion is computed against the original
/// eligible subtotal, so discounts never compound. A promotion that fails to
/// compute is logged and skipped.
///
/// # Errors
///
/// Returns [`StackingError::CurrencyMismatch`] if `subtotal` is not in the
/// cart's currency, or [`StackingError::Cart`] if it differs from the
/// recomputed subtotal by more than one minor unit.
pub fn resolve<'a>(
    promotions: &[Promotion<'a>],
    cart: &Cart<'a>,
    subtotal: Money<'a, Currency>,
) -> Result<DiscountResult<'a>, StackingError> {
    let currency = cart.currency();

    if subtotal.currency() != currency {
        return Err(StackingError::CurrencyMismatch(
            subtotal.currency().iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    let subtotal = cart.verified_subtotal(Some(subtotal))?;

    let mut candidates: SmallVec<[Candidate<'_, 'a>; 8]> = promotions
        .iter()
        .filter(|promotion| {
            let meets_minimum = promotion.meets_minimum(subtotal);

            if !meets_minimum {
                debug!(
                    promotion = %promotion.id(),
                    min_order_amount = %promotion.min_order_amount(),
                    "subtotal below minimum order amount"
                );
            }

            meets_minimum
        })
        .filter_map(|promotion| match candidate_amount(promotion, cart, subtotal) {
            Ok(amount) => Some(Candidate {
                promotion,
                amount: amount.to_minor_units(),
            }),
            Err(error) => {
                warn!(promotion = %promotion.id(), %error, "skipping promotion");

                None
            }
        })
        .collect();

    candidates.sort_by(application_order);

    let ceiling = subtotal.to_minor_units().max(0);
    let mut total = 0_i64;
    let mut applied = Vec::with_capacity(candidates.len());

    for Candidate { promotion, amount } in candidates {
        let headroom = ceiling.saturating_sub(total);
        let amount = amount.min(headroom);

        debug!(promotion = %promotion.id(), amount, headroom, "evaluated promotion");

        if amount <= 0 {
            continue;
        }

        total = total.saturating_add(amount);

        applied.push(AppliedPromotion {
            promotion_id: promotion.id().clone(),
            name: promotion.name().to_string(),
            amount: Money::from_minor(amount, currency),
        });
    }

    Ok(DiscountResult {
        discount_amount: Money::from_minor(total, currency),
        applied_promotions: applied,
    })
}

/// A gated promotion with its untrimmed discount in minor units.
struct Candidate<'p, 'a> {
    promotion: &'p Promotion<'a>,
    amount: i64,
}

impl Candidate<'_, '_> {
    /// Flat kinds rank by amount off, percentages by points.
    fn rank(&self) -> Decimal {
        match self.promotion.kind() {
            PromotionKind::Percentage(percent) => percent_points(*percent),
            _ => Decimal::from(self.amount),
        }
    }
}

fn candidate_amount<'a>(
    promotion: &Promotion<'a>,
    cart: &Cart<'a>,
    subtotal: Money<'a, Currency>,
) -> Result<Money<'a, Currency>, DiscountError> {
    let matched = promotion.scope().matches(cart)?;

    compute_discount(promotion, &matched, subtotal)
}

fn application_order(a: &Candidate<'_, '_>, b: &Candidate<'_, '_>) -> Ordering {
    b.promotion
        .kind()
        .is_flat()
        .cmp(&a.promotion.kind().is_flat())
        .then_with(|| b.rank().cmp(&a.rank()))
        .then_with(|| a.promotion.id().cmp(b.promotion.id()))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::{
        discounts::percent_from_points, items::CartItem, promotions::kind::PromotionKind,
    };

    use super::*;

    fn cart<'a>() -> Result<Cart<'a>, crate::cart::CartError> {
        Cart::with_items(
            [
                CartItem::new("prod-1", "shoes", 2, Money::from_minor(10_000, GBP)),
                CartItem::new("prod-2", "hats", 1, Money::from_minor(30_000, GBP)),
            ],
            GBP,
        )
    }

    fn percentage<'a>(
        id: &str,
        points: i64,
    ) -> Result<Promotion<'a>, crate::promotions::PromotionError> {
        Promotion::builder(
            id,
            "biz",
            format!("{points}% off"),
            PromotionKind::Percentage(percent_from_points(Decimal::from(points))),
            GBP,
        )
        .build()
    }

    fn fixed<'a>(id: &str, minor: i64) -> Result<Promotion<'a>, crate::promotions::PromotionError> {
        Promotion::builder(
            id,
            "biz",
            format!("{minor}p off"),
            PromotionKind::Fixed(Money::from_minor(minor, GBP)),
            GBP,
        )
        .build()
    }

    fn ids<'r>(result: &'r DiscountResult<'_>) -> Vec<&'r str> {
        result.promotion_ids().map(PromotionId::as_str).collect()
    }

    #[test]
    fn flat_promotions_apply_before_percentages() -> TestResult {
        let cart = cart()?;
        let promotions = [percentage("pct", 10)?, fixed("flat", 2_000)?];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        assert_eq!(ids(&result), ["flat", "pct"]);
        assert_eq!(result.discount_amount(), Money::from_minor(7_000, GBP));

        Ok(())
    }

    #[test]
    fn ties_break_by_value_then_id() -> TestResult {
        let cart = cart()?;
        let promotions = [
            fixed("b-small", 500)?,
            fixed("c-big", 1_000)?,
            fixed("a-small", 500)?,
        ];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        assert_eq!(ids(&result), ["c-big", "a-small", "b-small"]);

        Ok(())
    }

    #[test]
    fn minimum_order_amount_excludes_promotion() -> TestResult {
        let cart = cart()?;
        let promotions = [Promotion::builder(
            "big-spender",
            "biz",
            "£100 off £1000",
            PromotionKind::Threshold(Money::from_minor(10_000, GBP)),
            GBP,
        )
        .min_order_amount(Money::from_minor(100_000, GBP))
        .build()?];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        assert!(result.is_empty());
        assert_eq!(result.discount_amount(), Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn total_is_clamped_and_trimmed_to_subtotal() -> TestResult {
        let cart = cart()?;
        let promotions = [
            fixed("first", 40_000)?,
            fixed("second", 20_000)?,
            fixed("third", 5_000)?,
        ];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        let amounts: Vec<i64> = result
            .applied_promotions()
            .iter()
            .map(|applied| applied.amount().to_minor_units())
            .collect();

        assert_eq!(amounts, [40_000, 10_000]);
        assert_eq!(result.discount_amount(), Money::from_minor(50_000, GBP));

        Ok(())
    }

    #[test]
    fn failing_promotion_is_skipped() -> TestResult {
        let cart = cart()?;
        let promotions = [
            Promotion::builder(
                "dollars",
                "biz",
                "$5 off",
                PromotionKind::Fixed(Money::from_minor(500, USD)),
                USD,
            )
            .build()?,
            fixed("pounds", 500)?,
        ];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        assert_eq!(ids(&result), ["pounds"]);

        Ok(())
    }

    #[test]
    fn subtotal_in_foreign_currency_is_rejected() -> TestResult {
        let cart = cart()?;

        assert_eq!(
            resolve(&[], &cart, Money::from_minor(50_000, USD)),
            Err(StackingError::CurrencyMismatch("USD", "GBP"))
        );

        Ok(())
    }

    #[test]
    fn claimed_subtotal_above_cart_is_rejected() -> TestResult {
        let cart = Cart::with_items(
            [CartItem::new("prod-1", "shoes", 5, Money::from_minor(10_000, GBP))],
            GBP,
        )?;
        let promotions = [Promotion::builder(
            "big-spender",
            "biz",
            "£800 off £1000",
            PromotionKind::Threshold(Money::from_minor(80_000, GBP)),
            GBP,
        )
        .min_order_amount(Money::from_minor(100_000, GBP))
        .build()?];

        assert_eq!(
            resolve(&promotions, &cart, Money::from_minor(100_000, GBP)),
            Err(StackingError::Cart(CartError::SubtotalMismatch(100_000, 50_000)))
        );

        Ok(())
    }

    #[test]
    fn subtotal_within_one_minor_unit_uses_recomputed_value() -> TestResult {
        let cart = cart()?;
        let promotions = [fixed("everything", 60_000)?];

        let result = resolve(&promotions, &cart, Money::from_minor(50_001, GBP))?;

        assert_eq!(result.discount_amount(), Money::from_minor(50_000, GBP));

        Ok(())
    }

    #[test]
    fn buy_x_get_y_ranks_by_amount_off() -> TestResult {
        let cart = cart()?;
        let promotions = [
            Promotion::builder(
                "bogo",
                "biz",
                "Second pair free",
                PromotionKind::BuyXGetY(crate::promotions::kind::BuyXGetY::new(
                    1,
                    1,
                    percent_from_points(Decimal::ONE_HUNDRED),
                )?),
                GBP,
            )
            .scope(crate::scope::PromotionScope::Category("shoes".to_string()))
            .build()?,
            fixed("flat", 15_000)?,
        ];

        let result = resolve(&promotions, &cart, cart.subtotal()?)?;

        // the free pair is worth 10_000, less than the flat 15_000
        assert_eq!(ids(&result), ["flat", "bogo"]);

        Ok(())
    }

    #[test]
    fn empty_catalog_discounts_nothing() -> TestResult {
        let cart = cart()?;

        let result = resolve(&[], &cart, cart.subtotal()?)?;

        assert_eq!(result, DiscountResult::none(GBP));

        Ok(())
    }
}
