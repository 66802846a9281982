//! Usage Ledgers

use async_trait::async_trait;
use mockall::automock;
use rebate::{
    ids::{CustomerId, PromotionId},
    ledger::{InMemoryUsageLedger, RedemptionOutcome},
};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::promotions::{
        UsageLedgerError, repositories::redemptions::PgRedemptionsRepository,
    },
};

/// Usage counters for promotions, updated once per committed sale.
#[automock]
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Attempt to record one redemption of `promotion_id`.
    ///
    /// The global counter only moves while it is below the usage limit; the
    /// customer's counter, when the promotion has a per-customer limit, moves
    /// with it or not at all.
    async fn try_record_redemption(
        &self,
        promotion_id: &PromotionId,
        customer: Option<CustomerId>,
    ) -> Result<RedemptionOutcome, UsageLedgerError>;
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn try_record_redemption(
        &self,
        promotion_id: &PromotionId,
        customer: Option<CustomerId>,
    ) -> Result<RedemptionOutcome, UsageLedgerError> {
        Ok(InMemoryUsageLedger::try_record_redemption(
            self,
            promotion_id,
            customer.as_ref(),
        )?)
    }
}

/// PostgreSQL-backed usage ledger.
#[derive(Debug, Clone)]
pub struct PgUsageLedger {
    db: Db,
    redemptions: PgRedemptionsRepository,
}

impl PgUsageLedger {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            redemptions: PgRedemptionsRepository::new(),
        }
    }
}

#[async_trait]
impl UsageLedger for PgUsageLedger {
    #[tracing::instrument(
        name = "promotions.ledger.try_record_redemption",
        skip(self, customer),
        fields(promotion = %promotion_id, has_customer = customer.is_some()),
        err
    )]
    async fn try_record_redemption(
        &self,
        promotion_id: &PromotionId,
        customer: Option<CustomerId>,
    ) -> Result<RedemptionOutcome, UsageLedgerError> {
        let mut tx = self.db.begin().await?;

        let Some(usage) = self
            .redemptions
            .increment_usage_count(&mut tx, promotion_id)
            .await?
        else {
            let outcome = if self.redemptions.promotion_exists(&mut tx, promotion_id).await? {
                RedemptionOutcome::LimitReached
            } else {
                RedemptionOutcome::UnknownPromotion
            };

            warn!(promotion = %promotion_id, outcome = outcome.as_str(), "redemption rejected");

            return Ok(outcome);
        };

        if let Some(limit) = usage.per_customer_limit
            && let Some(customer) = customer.as_ref()
        {
            let counted = if limit > 0 {
                self.redemptions
                    .increment_customer_redemptions(&mut tx, promotion_id, customer, limit)
                    .await?
            } else {
                None
            };

            if counted.is_none() {
                let outcome = RedemptionOutcome::CustomerLimitReached;

                warn!(
                    promotion = %promotion_id,
                    customer = %customer,
                    outcome = outcome.as_str(),
                    "redemption rejected"
                );

                // dropping the transaction rolls back the global increment
                return Ok(outcome);
            }
        }

        let record = self
            .redemptions
            .create_redemption(&mut tx, promotion_id, customer.as_ref(), usage.usage_count)
            .await?;

        tx.commit().await?;

        info!(
            promotion = %promotion_id,
            redemption_uuid = %record.uuid,
            usage_count = record.usage_count,
            "recorded redemption"
        );

        Ok(RedemptionOutcome::Recorded(record.usage_count))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rebate::promotions::usage::UsageLimits;
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn in_memory_ledger_records_through_the_trait() -> TestResult {
        let id = PromotionId::from("welcome");
        let mut ledger = InMemoryUsageLedger::new();

        ledger.register(id.clone(), UsageLimits::with_per_customer_limit(1));

        let ledger: &dyn UsageLedger = &ledger;
        let alice = Some(CustomerId::from("alice"));

        assert_eq!(
            ledger.try_record_redemption(&id, alice.clone()).await?,
            RedemptionOutcome::Recorded(1)
        );
        assert_eq!(
            ledger.try_record_redemption(&id, alice).await?,
            RedemptionOutcome::CustomerLimitReached
        );
        assert_eq!(
            ledger
                .try_record_redemption(&PromotionId::from("missing"), None)
                .await?,
            RedemptionOutcome::UnknownPromotion
        );

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn pg_ledger_stops_at_usage_limit_under_contention() -> TestResult {
        let (ctx, _fixture) = TestContext::with_fixture("corner-shop").await;

        // launch-day is stored at 100 of 100; reopen it with room for three
        sqlx::query("UPDATE promotions SET usage_count = 97 WHERE id = 'launch-day'")
            .execute(ctx.db.pool())
            .await?;

        let ledger = Arc::new(PgUsageLedger::new(Db::new(ctx.db.pool().clone())));
        let id = PromotionId::from("launch-day");

        let attempts = (0..10).map(|_| {
            let ledger = Arc::clone(&ledger);
            let id = id.clone();

            tokio::spawn(async move { ledger.try_record_redemption(&id, None).await })
        });

        let mut recorded = 0;

        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await??.is_recorded() {
                recorded += 1;
            }
        }

        assert_eq!(recorded, 3);

        let count: i32 = sqlx::query_scalar("SELECT usage_count FROM promotions WHERE id = $1")
            .bind("launch-day")
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(count, 100);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn pg_ledger_rolls_back_global_count_when_customer_limit_is_reached() -> TestResult {
        let (ctx, _fixture) = TestContext::with_fixture("corner-shop").await;
        let ledger = PgUsageLedger::new(Db::new(ctx.db.pool().clone()));
        let id = PromotionId::from("ten-percent");
        let alice = Some(CustomerId::from("alice"));

        assert_eq!(
            ledger.try_record_redemption(&id, alice.clone()).await?,
            RedemptionOutcome::Recorded(1)
        );
        assert_eq!(
            ledger.try_record_redemption(&id, alice).await?,
            RedemptionOutcome::CustomerLimitReached
        );
        assert_eq!(
            ledger
                .try_record_redemption(&id, Some(CustomerId::from("bob")))
                .await?,
            RedemptionOutcome::Recorded(2)
        );
        assert_eq!(
            ledger
                .try_record_redemption(&PromotionId::from("missing"), None)
                .await?,
            RedemptionOutcome::UnknownPromotion
        );

        let redemptions: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM promotion_redemptions WHERE promotion_id = 'ten-percent'",
        )
        .fetch_one(ctx.db.pool())
        .await?;

        assert_eq!(redemptions, 2);

        Ok(())
    }
}
