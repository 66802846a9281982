//! Promotion Catalogs

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rebate::{catalog::eligible_at, ids::BusinessId, promotions::Promotion};
use tracing::{Span, info, warn};

use crate::{
    database::Db,
    domain::promotions::{
        CatalogError, PromotionsServiceError,
        records::PromotionRecord,
        repositories::promotions::PgPromotionsRepository,
    },
};

/// Source of the promotions a business currently has running.
#[automock]
#[async_trait]
pub trait PromotionCatalog: Send + Sync {
    /// Promotions for `business` that are active, inside their window at
    /// `now` and have usage remaining.
    async fn fetch_eligible(
        &self,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<Vec<Promotion<'static>>, CatalogError>;
}

/// PostgreSQL-backed catalog.
#[derive(Debug, Clone)]
pub struct PgPromotionCatalog {
    db: Db,
    promotions: PgPromotionsRepository,
}

impl PgPromotionCatalog {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            promotions: PgPromotionsRepository::new(),
        }
    }

    /// Every promotion stored for `business`, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] if the promotions cannot be read.
    #[tracing::instrument(
        name = "promotions.catalog.fetch_all",
        skip(self),
        fields(business = %business),
        err
    )]
    pub async fn fetch_all(
        &self,
        business: &BusinessId,
    ) -> Result<Vec<Promotion<'static>>, CatalogError> {
        let mut tx = self.db.begin().await?;

        let records = self.promotions.fetch_for_business(&mut tx, business).await?;

        tx.commit().await?;

        Ok(into_promotions(records))
    }

    /// Store `promotions` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any promotion cannot be stored; nothing is stored
    /// in that case.
    #[tracing::instrument(
        name = "promotions.catalog.import",
        skip(self, promotions),
        fields(promotion_count = promotions.len()),
        err
    )]
    pub async fn import(&self, promotions: &[Promotion<'_>]) -> Result<(), PromotionsServiceError> {
        let mut tx = self.db.begin().await?;

        for promotion in promotions {
            let record = PromotionRecord::from_promotion(promotion)?;

            self.promotions.create_promotion(&mut tx, &record).await?;
        }

        tx.commit().await?;

        info!("imported promotions");

        Ok(())
    }
}

#[async_trait]
impl PromotionCatalog for PgPromotionCatalog {
    #[tracing::instrument(
        name = "promotions.catalog.fetch_eligible",
        skip(self),
        fields(
            business = %business,
            now = %now,
            promotion_count = tracing::field::Empty
        ),
        err
    )]
    async fn fetch_eligible(
        &self,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<Vec<Promotion<'static>>, CatalogError> {
        let mut tx = self.db.begin().await?;

        let records = self.promotions.fetch_eligible(&mut tx, business, now).await?;

        tx.commit().await?;

        let promotions = into_promotions(records);

        Span::current().record("promotion_count", promotions.len());

        Ok(promotions)
    }
}

/// Catalog over a fixed list of promotions, filtered on every fetch.
#[derive(Debug, Clone, Default)]
pub struct StaticPromotionCatalog {
    promotions: Vec<Promotion<'static>>,
}

impl StaticPromotionCatalog {
    #[must_use]
    pub fn new(promotions: Vec<Promotion<'static>>) -> Self {
        Self { promotions }
    }
}

#[async_trait]
impl PromotionCatalog for StaticPromotionCatalog {
    async fn fetch_eligible(
        &self,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<Vec<Promotion<'static>>, CatalogError> {
        Ok(eligible_at(&self.promotions, business, now))
    }
}

/// Rows that no longer describe a valid promotion are skipped.
fn into_promotions(records: Vec<PromotionRecord>) -> Vec<Promotion<'static>> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();

            record
                .into_promotion()
                .inspect_err(|error| warn!(promotion = %id, %error, "skipping invalid promotion"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rebate::{
        discounts::percent_from_points,
        promotions::{kind::PromotionKind, status::ActiveWindow},
    };
    use rust_decimal::Decimal;
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    fn promotion(id: &str, business: &str) -> TestResult<Promotion<'static>> {
        Ok(Promotion::builder(
            id,
            business,
            id,
            PromotionKind::Percentage(percent_from_points(Decimal::TEN)),
            GBP,
        )
        .build()?)
    }

    #[tokio::test]
    async fn static_catalog_filters_by_business_and_window() -> TestResult {
        let now: Timestamp = "2025-06-15T12:00:00Z".parse()?;

        let expired = Promotion::builder(
            "expired",
            "corner-shop",
            "Expired",
            PromotionKind::Fixed(Money::from_minor(500, GBP)),
            GBP,
        )
        .window(ActiveWindow::new(None, Some("2025-01-01T00:00:00Z".parse()?)))
        .build()?;

        let catalog = StaticPromotionCatalog::new(vec![
            promotion("ten", "corner-shop")?,
            promotion("elsewhere", "other-shop")?,
            expired,
        ]);

        let eligible = catalog
            .fetch_eligible(&BusinessId::from("corner-shop"), now)
            .await?;

        let ids: Vec<&str> = eligible.iter().map(|p| p.id().as_str()).collect();

        assert_eq!(ids, ["ten"]);

        Ok(())
    }

    #[test]
    fn invalid_records_are_skipped() -> TestResult {
        let valid = PromotionRecord::from_promotion(&promotion("ten", "corner-shop")?)?;

        let mut bad_currency = valid.clone();

        bad_currency.id = "broken".to_string();
        bad_currency.currency = "XYZ".to_string();

        let mut bad_scope = PromotionRecord::from_promotion(&promotion("brand", "corner-shop")?)?;

        bad_scope.scope_kind = "brand".to_string();

        let fiver = PromotionRecord::from_promotion(&promotion("fiver", "corner-shop")?)?;

        let promotions = into_promotions(vec![bad_currency, valid, bad_scope, fiver]);

        let ids: Vec<&str> = promotions.iter().map(|p| p.id().as_str()).collect();

        assert_eq!(ids, ["ten", "fiver"]);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn pg_catalog_returns_only_eligible_promotions() -> TestResult {
        let (ctx, fixture) = TestContext::with_fixture("corner-shop").await;

        let eligible = ctx
            .app
            .catalog
            .fetch_eligible(fixture.business()?, fixture.now())
            .await?;

        let mut expected = eligible_at(fixture.promotions(), fixture.business()?, fixture.now());

        expected.sort_by(|a, b| a.id().cmp(b.id()));

        assert_eq!(eligible, expected);

        let all = ctx.app.catalog.fetch_all(fixture.business()?).await?;

        assert_eq!(all.len(), fixture.promotions().len());

        Ok(())
    }
}
