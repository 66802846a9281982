//! Promotions Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rebate::ids::BusinessId;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::promotions::records::PromotionRecord;

const CREATE_PROMOTION_SQL: &str = include_str!("../sql/create_promotion.sql");
const FETCH_ELIGIBLE_PROMOTIONS_SQL: &str = include_str!("../sql/fetch_eligible_promotions.sql");
const FETCH_BUSINESS_PROMOTIONS_SQL: &str = include_str!("../sql/fetch_business_promotions.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPromotionsRepository;

impl PgPromotionsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_promotion(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &PromotionRecord,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_PROMOTION_SQL)
            .bind(&record.id)
            .bind(&record.business_id)
            .bind(&record.name)
            .bind(&record.kind)
            .bind(&record.currency)
            .bind(record.percent)
            .bind(record.amount_minor)
            .bind(record.buy_quantity)
            .bind(record.get_quantity)
            .bind(record.min_order_amount_minor)
            .bind(record.max_discount_minor)
            .bind(record.usage_limit)
            .bind(record.usage_count)
            .bind(record.per_customer_limit)
            .bind(record.start_at.map(SqlxTimestamp::from))
            .bind(record.end_at.map(SqlxTimestamp::from))
            .bind(record.is_active)
            .bind(&record.scope_kind)
            .bind(&record.scope_category)
            .bind(&record.scope_product_ids)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Active, in-window promotions with usage remaining.
    pub(crate) async fn fetch_eligible(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<Vec<PromotionRecord>, sqlx::Error> {
        query_as::<Postgres, PromotionRecord>(FETCH_ELIGIBLE_PROMOTIONS_SQL)
            .bind(business.as_str())
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await
    }

    /// Every promotion the business has, whatever its status.
    pub(crate) async fn fetch_for_business(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        business: &BusinessId,
    ) -> Result<Vec<PromotionRecord>, sqlx::Error> {
        query_as::<Postgres, PromotionRecord>(FETCH_BUSINESS_PROMOTIONS_SQL)
            .bind(business.as_str())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for PromotionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            business_id: row.try_get("business_id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            currency: row.try_get("currency")?,
            percent: row.try_get("percent")?,
            amount_minor: row.try_get("amount_minor")?,
            buy_quantity: row.try_get("buy_quantity")?,
            get_quantity: row.try_get("get_quantity")?,
            min_order_amount_minor: row.try_get("min_order_amount_minor")?,
            max_discount_minor: row.try_get("max_discount_minor")?,
            usage_limit: row.try_get("usage_limit")?,
            usage_count: row.try_get("usage_count")?,
            per_customer_limit: row.try_get("per_customer_limit")?,
            start_at: row
                .try_get::<Option<SqlxTimestamp>, _>("start_at")?
                .map(SqlxTimestamp::to_jiff),
            end_at: row
                .try_get::<Option<SqlxTimestamp>, _>("end_at")?
                .map(SqlxTimestamp::to_jiff),
            is_active: row.try_get("is_active")?,
            scope_kind: row.try_get("scope_kind")?,
            scope_category: row.try_get("scope_category")?,
            scope_product_ids: row.try_get("scope_product_ids")?,
        })
    }
}
