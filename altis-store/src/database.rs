use crate::app_config::DatabaseConfig;
use crate::flight_repo::PostgresFlightRepository;
use crate::transaction::{map_sqlx_error, PgStoreTransaction};
use altis_core::repository::{StoreResult, TransactionalStore};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn flight_catalog(&self) -> PostgresFlightRepository {
        PostgresFlightRepository {
            pool: self.pool.clone(),
        }
    }

    /// Empties accounts, capacities and reservations and restarts the
    /// reservation counter. The flight schedule is left alone.
    pub async fn clear_tables(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for statement in [
            "DELETE FROM reservations",
            "DELETE FROM flight_capacities",
            "DELETE FROM accounts",
            "UPDATE reservation_sequence SET last_id = 0",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        warn!("Reservation tables cleared");
        Ok(())
    }
}

#[async_trait]
impl TransactionalStore for DbClient {
    type Tx = PgStoreTransaction;

    async fn begin(&self) -> StoreResult<PgStoreTransaction> {
        PgStoreTransaction::begin(&self.pool).await
    }
}
