//! Promotions Service

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use rebate::{
    cart::Cart,
    ids::{BusinessId, CustomerId, PromotionId},
    ledger::RedemptionReport,
    stacking::{DiscountResult, resolve},
};
use rusty_money::{Money, iso::Currency};
use tracing::{Span, warn};

use crate::domain::promotions::{
    PromotionsServiceError, catalog::PromotionCatalog, ledger::UsageLedger,
};

/// Quotes carts against a business's promotions and records redemptions
/// once a sale commits.
#[derive(Clone)]
pub struct PromotionsService {
    catalog: Arc<dyn PromotionCatalog>,
    ledger: Arc<dyn UsageLedger>,
}

impl fmt::Debug for PromotionsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromotionsService").finish_non_exhaustive()
    }
}

impl PromotionsService {
    #[must_use]
    pub fn new(catalog: Arc<dyn PromotionCatalog>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self { catalog, ledger }
    }

    /// Work out the discount for `cart`.
    ///
    /// Nothing is recorded; quoting the same cart twice gives the same
    /// answer. If the catalog cannot be read the cart is quoted without
    /// promotions.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart's subtotal cannot be computed or differs
    /// from `claimed_subtotal` by more than one minor unit.
    #[tracing::instrument(
        name = "promotions.service.quote",
        skip(self, cart, claimed_subtotal),
        fields(
            business = %business,
            lines = cart.len(),
            promotion_count = tracing::field::Empty,
            discount = tracing::field::Empty
        ),
        err
    )]
    pub async fn quote(
        &self,
        business: &BusinessId,
        cart: &Cart<'static>,
        claimed_subtotal: Option<Money<'static, Currency>>,
        now: Timestamp,
    ) -> Result<DiscountResult<'static>, PromotionsServiceError> {
        let subtotal = cart.verified_subtotal(claimed_subtotal)?;

        let promotions = match self.catalog.fetch_eligible(business, now).await {
            Ok(promotions) => promotions,
            Err(error) => {
                warn!(%error, "quoting without promotions");

                Vec::new()
            }
        };

        let span = Span::current();

        span.record("promotion_count", promotions.len());

        let result = resolve(&promotions, cart, subtotal)?;

        span.record(
            "discount",
            tracing::field::display(result.discount_amount()),
        );

        Ok(result)
    }

    /// Record one redemption for each promotion applied to a committed sale.
    ///
    /// Each distinct promotion gets one attempt; repeated IDs are ignored.
    /// Rejections are returned in the report, not retried; the caller must
    /// take them back off the sale. An attempt the ledger could not complete
    /// is reported as failed and the remaining promotions are still attempted,
    /// so redemptions recorded around it are never lost from the report.
    #[tracing::instrument(
        name = "promotions.service.redeem",
        skip(self, promotion_ids, customer),
        fields(promotion_count = promotion_ids.len())
    )]
    pub async fn redeem(
        &self,
        promotion_ids: &[PromotionId],
        customer: Option<&CustomerId>,
    ) -> RedemptionReport {
        let mut report = RedemptionReport::default();

        for promotion_id in promotion_ids {
            if report.contains(promotion_id) {
                continue;
            }

            match self
                .ledger
                .try_record_redemption(promotion_id, customer.cloned())
                .await
            {
                Ok(outcome) => {
                    if !outcome.is_recorded() {
                        warn!(
                            promotion = %promotion_id,
                            outcome = outcome.as_str(),
                            "applied promotion could not be redeemed"
                        );
                    }

                    report.push(promotion_id.clone(), outcome);
                }
                Err(error) => {
                    warn!(promotion = %promotion_id, %error, "redemption failed");

                    report.push_failure(promotion_id.clone(), error);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use rebate::{
        discounts::percent_from_points,
        items::CartItem,
        ledger::RedemptionOutcome,
        promotions::{Promotion, kind::PromotionKind},
    };
    use rust_decimal::Decimal;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::domain::promotions::{
        CatalogError, UsageLedgerError, catalog::MockPromotionCatalog, ledger::MockUsageLedger,
    };

    use super::*;

    fn cart() -> TestResult<Cart<'static>> {
        Ok(Cart::with_items(
            [
                CartItem::new("prod-1", "shoes", 2, Money::from_minor(10_000, GBP)),
                CartItem::new("prod-2", "hats", 1, Money::from_minor(30_000, GBP)),
            ],
            GBP,
        )?)
    }

    fn ten_percent() -> TestResult<Promotion<'static>> {
        Ok(Promotion::builder(
            "ten",
            "corner-shop",
            "10% off",
            PromotionKind::Percentage(percent_from_points(Decimal::TEN)),
            GBP,
        )
        .build()?)
    }

    fn now() -> TestResult<Timestamp> {
        Ok("2025-06-15T12:00:00Z".parse()?)
    }

    fn service(catalog: MockPromotionCatalog, ledger: MockUsageLedger) -> PromotionsService {
        PromotionsService::new(Arc::new(catalog), Arc::new(ledger))
    }

    #[tokio::test]
    async fn quote_applies_catalog_promotions() -> TestResult {
        let promotion = ten_percent()?;
        let mut catalog = MockPromotionCatalog::new();

        catalog
            .expect_fetch_eligible()
            .times(1)
            .returning(move |_, _| Ok(vec![promotion.clone()]));

        let result = service(catalog, MockUsageLedger::new())
            .quote(&BusinessId::from("corner-shop"), &cart()?, None, now()?)
            .await?;

        assert_eq!(result.discount_amount(), Money::from_minor(5_000, GBP));

        Ok(())
    }

    #[tokio::test]
    async fn quote_without_catalog_falls_back_to_no_promotions() -> TestResult {
        let mut catalog = MockPromotionCatalog::new();

        catalog
            .expect_fetch_eligible()
            .returning(|_, _| Err(CatalogError::Unavailable(sqlx::Error::PoolTimedOut)));

        let result = service(catalog, MockUsageLedger::new())
            .quote(&BusinessId::from("corner-shop"), &cart()?, None, now()?)
            .await?;

        assert!(result.is_empty());
        assert_eq!(result.discount_amount(), Money::from_minor(0, GBP));

        Ok(())
    }

    #[tokio::test]
    async fn quote_rejects_mismatched_claimed_subtotal() -> TestResult {
        let mut catalog = MockPromotionCatalog::new();

        catalog.expect_fetch_eligible().never();

        let result = service(catalog, MockUsageLedger::new())
            .quote(
                &BusinessId::from("corner-shop"),
                &cart()?,
                Some(Money::from_minor(49_000, GBP)),
                now()?,
            )
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Cart(_))),
            "expected Cart error, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn redeem_attempts_each_promotion_once_and_reports_rejections() -> TestResult {
        let mut ledger = MockUsageLedger::new();
        let alice = CustomerId::from("alice");

        ledger
            .expect_try_record_redemption()
            .with(eq(PromotionId::from("ten")), eq(Some(alice.clone())))
            .times(1)
            .returning(|_, _| Ok(RedemptionOutcome::Recorded(3)));

        ledger
            .expect_try_record_redemption()
            .with(eq(PromotionId::from("launch")), eq(Some(alice.clone())))
            .times(1)
            .returning(|_, _| Ok(RedemptionOutcome::LimitReached));

        let report = service(MockPromotionCatalog::new(), ledger)
            .redeem(
                &[
                    PromotionId::from("ten"),
                    PromotionId::from("launch"),
                    PromotionId::from("ten"),
                ],
                Some(&alice),
            )
            .await;

        assert_eq!(report.recorded(), [(PromotionId::from("ten"), 3)]);
        assert_eq!(
            report.rejected(),
            [(PromotionId::from("launch"), RedemptionOutcome::LimitReached)]
        );

        Ok(())
    }

    #[tokio::test]
    async fn redeem_reports_ledger_failures_and_keeps_earlier_redemptions() -> TestResult {
        let mut ledger = MockUsageLedger::new();

        ledger
            .expect_try_record_redemption()
            .with(eq(PromotionId::from("ten")), eq(None))
            .times(1)
            .returning(|_, _| Ok(RedemptionOutcome::Recorded(1)));

        ledger
            .expect_try_record_redemption()
            .with(eq(PromotionId::from("launch")), eq(None))
            .times(1)
            .returning(|_, _| Err(UsageLedgerError::Unavailable(sqlx::Error::PoolClosed)));

        ledger
            .expect_try_record_redemption()
            .with(eq(PromotionId::from("fiver")), eq(None))
            .times(1)
            .returning(|_, _| Ok(RedemptionOutcome::Recorded(7)));

        let report = service(MockPromotionCatalog::new(), ledger)
            .redeem(
                &[
                    PromotionId::from("ten"),
                    PromotionId::from("launch"),
                    PromotionId::from("fiver"),
                ],
                None,
            )
            .await;

        assert_eq!(
            report.recorded(),
            [(PromotionId::from("ten"), 1), (PromotionId::from("fiver"), 7)]
        );

        let failed: Vec<&PromotionId> = report.failed().iter().map(|(id, _)| id).collect();

        assert_eq!(failed, [&PromotionId::from("launch")]);
        assert!(!report.is_clean());

        Ok(())
    }
}
