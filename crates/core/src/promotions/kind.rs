//! Promotion Kinds
//!
//! Each kind carries only the payload it needs.

use std::{fmt, str::FromStr};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};

use crate::promotions::PromotionError;

/// Buy-X-get-Y payload: for every `buy_qty + get_qty` eligible units,
/// `get_qty` units are discounted by `get_discount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyXGetY {
    buy_qty: u32,
    get_qty: u32,
    get_discount: Percentage,
}

impl BuyXGetY {
    /// Create a new buy-X-get-Y payload.
    ///
    /// # Errors
    ///
    /// Returns an error if either quantity is zero or the discount is outside 0..=100%.
    pub fn new(
        buy_qty: u32,
        get_qty: u32,
        get_discount: Percentage,
    ) -> Result<Self, PromotionError> {
        if buy_qty == 0 || get_qty == 0 {
            return Err(PromotionError::InvalidQuantity);
        }

        let fraction = get_discount * Decimal::ONE;

        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(PromotionError::PercentOutOfRange);
        }

        Ok(Self {
            buy_qty,
            get_qty,
            get_discount,
        })
    }

    /// Units that must be bought per group
    pub const fn buy_qty(&self) -> u32 {
        self.buy_qty
    }

    /// Units discounted per group
    pub const fn get_qty(&self) -> u32 {
        self.get_qty
    }

    /// Discount on each "get" unit
    pub const fn get_discount(&self) -> Percentage {
        self.get_discount
    }

    /// `buy_qty + get_qty`
    pub fn group_size(&self) -> u64 {
        u64::from(self.buy_qty) + u64::from(self.get_qty)
    }
}

/// Promotion type and its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromotionKind<'a> {
    /// Percentage off the eligible subtotal (e.g. "10% off shoes")
    Percentage(Percentage),

    /// Flat amount off, once per promotion (e.g. "£20 off")
    Fixed(Money<'a, Currency>),

    /// Buy X units, get Y discounted
    BuyXGetY(BuyXGetY),

    /// Eligible lines together cost at most a fixed price
    Bundle(Money<'a, Currency>),

    /// Flat amount off once the order reaches `min_order_amount`
    Threshold(Money<'a, Currency>),
}

impl<'a> PromotionKind<'a> {
    /// Flat kinds are applied before percentage kinds.
    pub const fn is_flat(&self) -> bool {
        !matches!(self, Self::Percentage(_))
    }

    /// Any money carried by the payload.
    pub fn amount(&self) -> Option<&Money<'a, Currency>> {
        match self {
            Self::Fixed(amount) | Self::Bundle(amount) | Self::Threshold(amount) => Some(amount),
            Self::Percentage(_) | Self::BuyXGetY(_) => None,
        }
    }

    /// The storage name of this kind.
    pub const fn tag(&self) -> PromotionKindTag {
        match self {
            Self::Percentage(_) => PromotionKindTag::Percentage,
            Self::Fixed(_) => PromotionKindTag::Fixed,
            Self::BuyXGetY(_) => PromotionKindTag::BuyXGetY,
            Self::Bundle(_) => PromotionKindTag::Bundle,
            Self::Threshold(_) => PromotionKindTag::Threshold,
        }
    }
}

/// Promotion kind without its payload, as named in storage and fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionKindTag {
    /// [`PromotionKind::Percentage`]
    Percentage,

    /// [`PromotionKind::Fixed`]
    Fixed,

    /// [`PromotionKind::BuyXGetY`]
    BuyXGetY,

    /// [`PromotionKind::Bundle`]
    Bundle,

    /// [`PromotionKind::Threshold`]
    Threshold,
}

impl PromotionKindTag {
    /// Storage name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::BuyXGetY => "buy_x_get_y",
            Self::Bundle => "bundle",
            Self::Threshold => "threshold",
        }
    }
}

impl fmt::Display for PromotionKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromotionKindTag {
    type Err = PromotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            "buy_x_get_y" => Ok(Self::BuyXGetY),
            "bundle" => Ok(Self::Bundle),
            "threshold" => Ok(Self::Threshold),
            other => Err(PromotionError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn buy_x_get_y_rejects_zero_quantities() {
        assert_eq!(
            BuyXGetY::new(0, 1, Percentage::from(1.0)),
            Err(PromotionError::InvalidQuantity)
        );
        assert_eq!(
            BuyXGetY::new(2, 0, Percentage::from(1.0)),
            Err(PromotionError::InvalidQuantity)
        );
    }

    #[test]
    fn buy_x_get_y_rejects_out_of_range_discount() {
        assert_eq!(
            BuyXGetY::new(2, 1, Percentage::from(1.5)),
            Err(PromotionError::PercentOutOfRange)
        );
    }

    #[test]
    fn buy_x_get_y_group_size() -> TestResult {
        let bogo = BuyXGetY::new(2, 1, Percentage::from(1.0))?;

        assert_eq!(bogo.group_size(), 3);

        Ok(())
    }

    #[test]
    fn only_percentage_is_not_flat() -> TestResult {
        assert!(!PromotionKind::Percentage(Percentage::from(0.25)).is_flat());
        assert!(PromotionKind::Fixed(Money::from_minor(100, GBP)).is_flat());
        assert!(PromotionKind::Bundle(Money::from_minor(100, GBP)).is_flat());
        assert!(PromotionKind::Threshold(Money::from_minor(100, GBP)).is_flat());
        assert!(PromotionKind::BuyXGetY(BuyXGetY::new(1, 1, Percentage::from(0.5))?).is_flat());

        Ok(())
    }

    #[test]
    fn kind_tags_round_trip_through_storage_names() -> TestResult {
        for tag in [
            PromotionKindTag::Percentage,
            PromotionKindTag::Fixed,
            PromotionKindTag::BuyXGetY,
            PromotionKindTag::Bundle,
            PromotionKindTag::Threshold,
        ] {
            assert_eq!(tag.as_str().parse::<PromotionKindTag>()?, tag);
        }

        assert_eq!(
            "bogo".parse::<PromotionKindTag>(),
            Err(PromotionError::UnknownKind("bogo".to_string()))
        );

        Ok(())
    }
}
