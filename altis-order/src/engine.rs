use crate::events::{LoggingObserver, ReservationObserver};
use crate::models::ReservationListing;
use crate::orchestrator::TransactionCoordinator;
use altis_core::identity::{Session, SessionManager};
use altis_core::repository::{FlightCatalog, TransactionalStore};
use altis_core::retry::RetryPolicy;
use altis_core::search::{SearchEngine, SearchOutcome, SearchRequest};
use altis_core::{CoreError, CoreResult};
use altis_shared::{Account, ReservationId};
use altis_store::{BusinessRules, Config, DbClient};
use std::sync::Arc;

/// One user-facing session over the reservation engine: one call per
/// command the front end offers.
///
/// Engines are cheap to create. Give each concurrent user its own engine
/// over the same store; the store is where sessions meet.
pub struct FlightEngine<S> {
    session: Session,
    accounts: SessionManager<S>,
    search: SearchEngine,
    coordinator: TransactionCoordinator<S>,
}

impl<S: TransactionalStore> FlightEngine<S> {
    pub fn new(
        store: Arc<S>,
        catalog: Arc<dyn FlightCatalog>,
        retry: RetryPolicy,
        rules: BusinessRules,
    ) -> Self {
        Self {
            session: Session::new(),
            accounts: SessionManager::new(store.clone(), retry.clone()),
            search: SearchEngine::new(catalog),
            coordinator: TransactionCoordinator::new(store, retry, rules),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReservationObserver>) -> Self {
        self.coordinator = self.coordinator.with_observer(observer);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        initial_balance: i64,
    ) -> CoreResult<Account> {
        self.accounts.create_account(username, password, initial_balance).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> CoreResult<()> {
        self.accounts.login(&mut self.session, username, password).await
    }

    pub async fn search(
        &mut self,
        origin_city: &str,
        dest_city: &str,
        direct_only: bool,
        day_of_month: i32,
        max_results: usize,
    ) -> CoreResult<SearchOutcome> {
        let request = SearchRequest::new(origin_city, dest_city, direct_only, day_of_month, max_results);
        self.search.search(&mut self.session, &request).await
    }

    pub async fn book(&self, itinerary_index: i64) -> CoreResult<ReservationId> {
        self.coordinator.book(&self.session, itinerary_index).await
    }

    pub async fn pay(&self, reservation_id: ReservationId) -> CoreResult<i64> {
        self.coordinator.pay(&self.session, reservation_id).await
    }

    pub async fn reservations(&self) -> CoreResult<ReservationListing> {
        self.coordinator.list_reservations(&self.session).await
    }

    pub async fn cancel(&self, reservation_id: ReservationId) -> CoreResult<()> {
        self.coordinator.cancel(&self.session, reservation_id).await
    }
}

impl FlightEngine<DbClient> {
    /// Engine backed by Postgres, wired from loaded configuration. Lifecycle
    /// events go to the log.
    pub async fn from_config(config: &Config) -> CoreResult<Self> {
        let db = DbClient::new(&config.database)
            .await
            .map_err(|e| CoreError::StorageUnavailable(e.to_string()))?;
        let catalog: Arc<dyn FlightCatalog> = Arc::new(db.flight_catalog());

        Ok(Self::new(
            Arc::new(db),
            catalog,
            config.retry.clone(),
            config.business_rules.clone(),
        )
        .with_observer(Arc::new(LoggingObserver)))
    }
}
