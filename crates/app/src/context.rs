//! App Context

use std::sync::Arc;

use rebate::{fixtures::Fixture, ledger::InMemoryUsageLedger};
use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::promotions::{
        catalog::{PgPromotionCatalog, StaticPromotionCatalog},
        ledger::PgUsageLedger,
        service::PromotionsService,
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply migrations")]
    Migrate(#[source] sqlx::migrate::MigrateError),
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub promotions: PromotionsService,
    pub catalog: PgPromotionCatalog,
}

impl AppContext {
    /// Build application context from a database URL, applying migrations.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection or applying
    /// migrations fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrate)?;

        Ok(Self::from_db(Db::new(pool)))
    }

    #[must_use]
    pub fn from_db(db: Db) -> Self {
        let catalog = PgPromotionCatalog::new(db.clone());

        Self {
            promotions: PromotionsService::new(
                Arc::new(catalog.clone()),
                Arc::new(PgUsageLedger::new(db)),
            ),
            catalog,
        }
    }
}

/// A promotions service over a loaded fixture, with in-memory usage counters.
#[must_use]
pub fn fixture_service(fixture: &Fixture<'static>) -> PromotionsService {
    let promotions = fixture.promotions().to_vec();
    let ledger = InMemoryUsageLedger::with_promotions(&promotions);

    PromotionsService::new(
        Arc::new(StaticPromotionCatalog::new(promotions)),
        Arc::new(ledger),
    )
}
