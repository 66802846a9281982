//! Redemptions Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use rebate::ids::{CustomerId, PromotionId};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};

use crate::domain::promotions::records::{RedemptionRecord, RedemptionUuid};

const INCREMENT_USAGE_COUNT_SQL: &str = include_str!("../sql/increment_usage_count.sql");
const PROMOTION_EXISTS_SQL: &str = include_str!("../sql/promotion_exists.sql");
const INCREMENT_CUSTOMER_REDEMPTIONS_SQL: &str =
    include_str!("../sql/increment_customer_redemptions.sql");
const CREATE_REDEMPTION_SQL: &str = include_str!("../sql/create_redemption.sql");

/// Global counter after a successful conditional increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IncrementedUsage {
    pub(crate) usage_count: i32,
    pub(crate) per_customer_limit: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgRedemptionsRepository;

impl PgRedemptionsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Increment the global counter if it is below the limit.
    ///
    /// Returns `None` when the promotion is missing or its limit is reached.
    pub(crate) async fn increment_usage_count(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        promotion_id: &PromotionId,
    ) -> Result<Option<IncrementedUsage>, sqlx::Error> {
        query_as::<Postgres, IncrementedUsage>(INCREMENT_USAGE_COUNT_SQL)
            .bind(promotion_id.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn promotion_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        promotion_id: &PromotionId,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(PROMOTION_EXISTS_SQL)
            .bind(promotion_id.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Increment the customer's counter if it is below `limit`.
    ///
    /// Returns `None` when the customer has used up their allowance.
    pub(crate) async fn increment_customer_redemptions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        promotion_id: &PromotionId,
        customer: &CustomerId,
        limit: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        query_scalar::<Postgres, i32>(INCREMENT_CUSTOMER_REDEMPTIONS_SQL)
            .bind(promotion_id.as_str())
            .bind(customer.as_str())
            .bind(limit)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_redemption(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        promotion_id: &PromotionId,
        customer: Option<&CustomerId>,
        usage_count: i32,
    ) -> Result<RedemptionRecord, sqlx::Error> {
        query_as::<Postgres, RedemptionRecord>(CREATE_REDEMPTION_SQL)
            .bind(RedemptionUuid::new().into_uuid())
            .bind(promotion_id.as_str())
            .bind(customer.map(CustomerId::as_str))
            .bind(usage_count)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for IncrementedUsage {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            usage_count: row.try_get("usage_count")?,
            per_customer_limit: row.try_get("per_customer_limit")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for RedemptionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let usage_count: i32 = row.try_get("usage_count")?;

        Ok(Self {
            uuid: RedemptionUuid::from_uuid(row.try_get("uuid")?),
            promotion_id: PromotionId::new(row.try_get::<String, _>("promotion_id")?),
            customer_id: row
                .try_get::<Option<String>, _>("customer_id")?
                .map(CustomerId::new),
            usage_count: u32::try_from(usage_count).map_err(|error| {
                sqlx::Error::ColumnDecode {
                    index: "usage_count".to_string(),
                    source: Box::new(error),
                }
            })?,
            redeemed_at: row.try_get::<SqlxTimestamp, _>("redeemed_at")?.to_jiff(),
        })
    }
}
