//! Promotion Fixtures

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    fixtures::{
        FixtureError,
        carts::{parse_percentage, parse_price},
    },
    ids::{BusinessId, ProductId},
    promotions::{
        Promotion,
        kind::{BuyXGetY, PromotionKind},
        status::ActiveWindow,
        usage::UsageLimits,
    },
    scope::PromotionScope,
};

/// Wrapper for promotions in YAML
#[derive(Debug, Deserialize)]
pub struct PromotionsFixture {
    /// Business the promotions belong to
    pub business: BusinessId,

    /// Currency of every amount in the file (e.g., "GBP")
    pub currency: String,

    /// Map of promotion ID -> promotion fixture
    pub promotions: FxHashMap<String, PromotionFixture>,
}

/// Promotion Fixture
#[derive(Debug, Deserialize)]
pub struct PromotionFixture {
    /// Promotion name
    pub name: String,

    /// Kind and payload
    #[serde(flatten)]
    pub kind: PromotionKindFixture,

    /// Lines the promotion may discount; every line when omitted
    #[serde(default)]
    pub scope: ScopeFixture,

    /// Minimum order amount (e.g., "50.00 GBP")
    #[serde(default)]
    pub min_order_amount: Option<String>,

    /// Discount cap (e.g., "30.00 GBP")
    #[serde(default)]
    pub max_discount: Option<String>,

    /// Global usage limit
    #[serde(default)]
    pub usage_limit: Option<u32>,

    /// Redemptions so far
    #[serde(default)]
    pub usage_count: u32,

    /// Per-customer usage limit
    #[serde(default)]
    pub per_customer_limit: Option<u32>,

    /// Window start (RFC 3339)
    #[serde(default)]
    pub start_at: Option<Timestamp>,

    /// Window end (RFC 3339)
    #[serde(default)]
    pub end_at: Option<Timestamp>,

    /// Pause switch
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Promotion kind and payload, tagged by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionKindFixture {
    /// Percentage off (e.g., "10%")
    Percentage {
        /// Percentage off
        percent: String,
    },

    /// Flat amount off (e.g., "20.00 GBP")
    Fixed {
        /// Amount off
        amount: String,
    },

    /// Buy X, get Y discounted
    BuyXGetY {
        /// Units bought per group
        buy: u32,

        /// Units discounted per group
        get: u32,

        /// Discount on each discounted unit; free when omitted
        #[serde(default = "default_get_discount")]
        discount: String,
    },

    /// Eligible lines together cost at most `price`
    Bundle {
        /// Bundle price
        price: String,
    },

    /// Flat amount off once the minimum order amount is met
    Threshold {
        /// Amount off
        amount: String,
    },
}

/// Scope Fixture
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScopeFixture {
    /// Scope kind: "all", "category" or "products"
    pub kind: String,

    /// Category name for category scopes
    pub category: Option<String>,

    /// Product IDs for product scopes
    pub products: Vec<ProductId>,
}

impl Default for ScopeFixture {
    fn default() -> Self {
        Self {
            kind: "all".to_string(),
            category: None,
            products: Vec::new(),
        }
    }
}

fn default_active() -> bool {
    true
}

fn default_get_discount() -> String {
    "100%".to_string()
}

fn money<'a>(price: &str) -> Result<Money<'a, Currency>, FixtureError> {
    let (minor, currency) = parse_price(price)?;

    Ok(Money::from_minor(minor, currency))
}

impl PromotionKindFixture {
    fn try_into_kind<'a>(self, id: &str) -> Result<PromotionKind<'a>, FixtureError> {
        Ok(match self {
            Self::Percentage { percent } => PromotionKind::Percentage(parse_percentage(&percent)?),
            Self::Fixed { amount } => PromotionKind::Fixed(money(&amount)?),
            Self::BuyXGetY { buy, get, discount } => {
                let bogo = BuyXGetY::new(buy, get, parse_percentage(&discount)?)
                    .map_err(|error| FixtureError::Promotion(id.to_string(), error))?;

                PromotionKind::BuyXGetY(bogo)
            }
            Self::Bundle { price } => PromotionKind::Bundle(money(&price)?),
            Self::Threshold { amount } => PromotionKind::Threshold(money(&amount)?),
        })
    }
}

impl PromotionFixture {
    /// Convert the fixture into a validated promotion.
    ///
    /// # Errors
    ///
    /// Returns an error if a price, percentage or scope cannot be parsed, or
    /// if the promotion fails validation.
    pub fn try_into_promotion<'a>(
        self,
        id: &str,
        business: &BusinessId,
        currency: &'static Currency,
    ) -> Result<Promotion<'a>, FixtureError> {
        let kind = self.kind.try_into_kind(id)?;

        let scope = PromotionScope::from_parts(
            &self.scope.kind,
            self.scope.category,
            self.scope.products,
        )
        .map_err(|error| FixtureError::Scope(id.to_string(), error))?;

        let mut builder = Promotion::builder(id, business.clone(), self.name, kind, currency)
            .scope(scope)
            .usage(UsageLimits {
                usage_limit: self.usage_limit,
                usage_count: self.usage_count,
                per_customer_limit: self.per_customer_limit,
            })
            .window(ActiveWindow::new(self.start_at, self.end_at))
            .active(self.active);

        if let Some(min_order_amount) = self.min_order_amount {
            builder = builder.min_order_amount(money(&min_order_amount)?);
        }

        if let Some(max_discount) = self.max_discount {
            builder = builder.max_discount(Some(money(&max_discount)?));
        }

        builder
            .build()
            .map_err(|error| FixtureError::Promotion(id.to_string(), error))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        discounts::percent_from_points,
        promotions::PromotionError,
        scope::{ScopeError, ScopeKind},
    };

    use super::*;

    fn parse(yaml: &str) -> Result<PromotionFixture, serde_norway::Error> {
        serde_norway::from_str(yaml)
    }

    #[test]
    fn percentage_fixture_with_defaults() -> TestResult {
        let promotion = parse("name: 10% off\nkind: percentage\npercent: 10%\n")?
            .try_into_promotion("ten", &BusinessId::from("biz"), GBP)?;

        assert_eq!(
            promotion.kind(),
            &PromotionKind::Percentage(percent_from_points(Decimal::TEN))
        );
        assert_eq!(promotion.scope().kind(), ScopeKind::All);
        assert!(promotion.is_active());
        assert!(!promotion.usage().has_constraints());

        Ok(())
    }

    #[test]
    fn buy_x_get_y_defaults_to_free() -> TestResult {
        let promotion = parse(
            "
name: 3 for 2
kind: buy_x_get_y
buy: 2
get: 1
scope:
  kind: products
  products: [prod-1]
",
        )?
        .try_into_promotion("three-for-two", &BusinessId::from("biz"), GBP)?;

        assert_eq!(
            promotion.kind(),
            &PromotionKind::BuyXGetY(BuyXGetY::new(
                2,
                1,
                percent_from_points(Decimal::ONE_HUNDRED)
            )?)
        );
        assert_eq!(promotion.scope().kind(), ScopeKind::Products);

        Ok(())
    }

    #[test]
    fn full_fixture_sets_limits_and_window() -> TestResult {
        let promotion = parse(
            "
name: Big spender
kind: threshold
amount: 10.00 GBP
min_order_amount: 100.00 GBP
max_discount: 5.00 GBP
usage_limit: 10
usage_count: 3
per_customer_limit: 1
start_at: 2025-01-01T00:00:00Z
end_at: 2025-12-31T23:59:59Z
active: false
",
        )?
        .try_into_promotion("big", &BusinessId::from("biz"), GBP)?;

        assert_eq!(promotion.min_order_amount(), Money::from_minor(10_000, GBP));
        assert_eq!(promotion.max_discount(), Some(Money::from_minor(500, GBP)));
        assert_eq!(promotion.usage().usage_limit, Some(10));
        assert_eq!(promotion.usage().usage_count, 3);
        assert_eq!(promotion.usage().per_customer_limit, Some(1));
        assert!(promotion.window().start_at().is_some());
        assert!(!promotion.is_active());

        Ok(())
    }

    #[test]
    fn unknown_scope_kind_is_reported_with_promotion_id() -> TestResult {
        let result = parse("name: Brand\nkind: fixed\namount: 1.00 GBP\nscope:\n  kind: brand\n")?
            .try_into_promotion("brand", &BusinessId::from("biz"), GBP);

        assert!(matches!(
            result,
            Err(FixtureError::Scope(id, ScopeError::UnknownKind(_))) if id == "brand"
        ));

        Ok(())
    }

    #[test]
    fn invalid_buy_x_get_y_is_reported_with_promotion_id() -> TestResult {
        let result = parse("name: Nothing\nkind: buy_x_get_y\nbuy: 0\nget: 1\n")?
            .try_into_promotion("nothing", &BusinessId::from("biz"), GBP);

        assert!(matches!(
            result,
            Err(FixtureError::Promotion(id, PromotionError::InvalidQuantity)) if id == "nothing"
        ));

        Ok(())
    }
}
