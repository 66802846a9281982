//! Promotions Records

use jiff::Timestamp;
use rebate::{
    discounts::{percent_from_points, percent_points},
    ids::{BusinessId, CustomerId, PromotionId},
    pricing::currency_from_code,
    promotions::{
        Promotion, PromotionError,
        kind::{BuyXGetY, PromotionKind, PromotionKindTag},
        status::ActiveWindow,
        usage::UsageLimits,
    },
    scope::{PromotionScope, ScopeError},
};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::uuids::TypedUuid;

/// Redemption UUID
pub type RedemptionUuid = TypedUuid<RedemptionRecord>;

/// One recorded redemption, kept for reconciliation.
#[derive(Debug, Clone)]
pub struct RedemptionRecord {
    pub uuid: RedemptionUuid,
    pub promotion_id: PromotionId,
    pub customer_id: Option<CustomerId>,
    pub usage_count: u32,
    pub redeemed_at: Timestamp,
}

/// Errors converting between stored rows and promotions.
#[derive(Debug, Error)]
pub enum PromotionRecordError {
    #[error("unknown currency {0}")]
    UnknownCurrency(String),

    #[error("{kind} promotion is missing {column}")]
    MissingColumn {
        kind: PromotionKindTag,
        column: &'static str,
    },

    #[error("column {0} is out of range")]
    OutOfRange(&'static str),

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// Promotion row as stored in `promotions`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionRecord {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub kind: String,
    pub currency: String,

    /// Percentage points for percentage and buy-x-get-y kinds
    pub percent: Option<Decimal>,

    /// Amount off, or the bundle price, in minor units
    pub amount_minor: Option<i64>,

    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub min_order_amount_minor: i64,
    pub max_discount_minor: Option<i64>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub per_customer_limit: Option<i32>,
    pub start_at: Option<Timestamp>,
    pub end_at: Option<Timestamp>,
    pub is_active: bool,
    pub scope_kind: String,
    pub scope_category: Option<String>,
    pub scope_product_ids: Vec<String>,
}

impl PromotionRecord {
    /// Flatten a promotion into its stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionRecordError::OutOfRange`] if a count does not fit the column.
    pub fn from_promotion(promotion: &Promotion<'_>) -> Result<Self, PromotionRecordError> {
        let (percent, amount_minor, buy_quantity, get_quantity) = match promotion.kind() {
            PromotionKind::Percentage(percent) => {
                (Some(percent_points(*percent)), None, None, None)
            }
            PromotionKind::Fixed(amount)
            | PromotionKind::Bundle(amount)
            | PromotionKind::Threshold(amount) => (None, Some(amount.to_minor_units()), None, None),
            PromotionKind::BuyXGetY(bogo) => (
                Some(percent_points(bogo.get_discount())),
                None,
                Some(to_column(bogo.buy_qty(), "buy_quantity")?),
                Some(to_column(bogo.get_qty(), "get_quantity")?),
            ),
        };

        let (scope_category, scope_product_ids) = match promotion.scope() {
            PromotionScope::All => (None, Vec::new()),
            PromotionScope::Category(category) => (Some(category.clone()), Vec::new()),
            PromotionScope::Products(products) => {
                let mut ids: Vec<String> = products.iter().map(ToString::to_string).collect();

                ids.sort_unstable();

                (None, ids)
            }
        };

        let usage = promotion.usage();

        Ok(Self {
            id: promotion.id().to_string(),
            business_id: promotion.business().to_string(),
            name: promotion.name().to_string(),
            kind: promotion.kind().tag().as_str().to_string(),
            currency: promotion.currency().iso_alpha_code.to_string(),
            percent,
            amount_minor,
            buy_quantity,
            get_quantity,
            min_order_amount_minor: promotion.min_order_amount().to_minor_units(),
            max_discount_minor: promotion.max_discount().map(|cap| cap.to_minor_units()),
            usage_limit: usage
                .usage_limit
                .map(|limit| to_column(limit, "usage_limit"))
                .transpose()?,
            usage_count: to_column(usage.usage_count, "usage_count")?,
            per_customer_limit: usage
                .per_customer_limit
                .map(|limit| to_column(limit, "per_customer_limit"))
                .transpose()?,
            start_at: promotion.window().start_at(),
            end_at: promotion.window().end_at(),
            is_active: promotion.is_active(),
            scope_kind: promotion.scope().kind().as_str().to_string(),
            scope_category,
            scope_product_ids,
        })
    }

    /// Rebuild the validated promotion this row describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency, kind or scope is unrecognised, a
    /// kind-specific column is missing, or the promotion fails validation.
    pub fn into_promotion(self) -> Result<Promotion<'static>, PromotionRecordError> {
        let currency = currency_from_code(&self.currency)
            .ok_or_else(|| PromotionRecordError::UnknownCurrency(self.currency.clone()))?;

        let tag = self.kind.parse::<PromotionKindTag>()?;
        let kind = self.kind_payload(tag, currency)?;

        let scope = PromotionScope::from_parts(
            &self.scope_kind,
            self.scope_category,
            self.scope_product_ids.into_iter().map(Into::into),
        )?;

        let usage = UsageLimits {
            usage_limit: self
                .usage_limit
                .map(|limit| from_column(limit, "usage_limit"))
                .transpose()?,
            usage_count: from_column(self.usage_count, "usage_count")?,
            per_customer_limit: self
                .per_customer_limit
                .map(|limit| from_column(limit, "per_customer_limit"))
                .transpose()?,
        };

        let promotion = Promotion::builder(
            self.id,
            BusinessId::new(self.business_id),
            self.name,
            kind,
            currency,
        )
        .min_order_amount(Money::from_minor(self.min_order_amount_minor, currency))
        .max_discount(
            self.max_discount_minor
                .map(|cap| Money::from_minor(cap, currency)),
        )
        .usage(usage)
        .window(ActiveWindow::new(self.start_at, self.end_at))
        .active(self.is_active)
        .scope(scope)
        .build()?;

        Ok(promotion)
    }

    fn kind_payload(
        &self,
        tag: PromotionKindTag,
        currency: &'static Currency,
    ) -> Result<PromotionKind<'static>, PromotionRecordError> {
        let missing = |column| PromotionRecordError::MissingColumn { kind: tag, column };

        let amount = || {
            self.amount_minor
                .map(|minor| Money::from_minor(minor, currency))
                .ok_or_else(|| missing("amount_minor"))
        };

        let percent = || {
            self.percent
                .map(percent_from_points)
                .ok_or_else(|| missing("percent"))
        };

        Ok(match tag {
            PromotionKindTag::Percentage => PromotionKind::Percentage(percent()?),
            PromotionKindTag::Fixed => PromotionKind::Fixed(amount()?),
            PromotionKindTag::Bundle => PromotionKind::Bundle(amount()?),
            PromotionKindTag::Threshold => PromotionKind::Threshold(amount()?),
            PromotionKindTag::BuyXGetY => {
                let buy = self.buy_quantity.ok_or_else(|| missing("buy_quantity"))?;
                let get = self.get_quantity.ok_or_else(|| missing("get_quantity"))?;

                PromotionKind::BuyXGetY(BuyXGetY::new(
                    from_column(buy, "buy_quantity")?,
                    from_column(get, "get_quantity")?,
                    percent()?,
                )?)
            }
        })
    }
}

fn to_column(value: u32, column: &'static str) -> Result<i32, PromotionRecordError> {
    i32::try_from(value).map_err(|_err| PromotionRecordError::OutOfRange(column))
}

fn from_column(value: i32, column: &'static str) -> Result<u32, PromotionRecordError> {
    u32::try_from(value).map_err(|_err| PromotionRecordError::OutOfRange(column))
}
