use crate::search::SearchRequest;
use crate::CoreResult;
use altis_shared::{Account, Flight, FlightId, Reservation, ReservationId};
use async_trait::async_trait;
use tracing::warn;

/// Failures reported by a storage adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The transaction lost a serialization race and was aborted.
    #[error("serialization conflict with a concurrent transaction")]
    Conflict,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only access to the flight schedule used by search.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    /// Non-canceled flights on the requested route and day, ordered by
    /// `(duration, id)` and capped at `limit`.
    async fn direct_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<Flight>>;

    /// Same-day pairs `(a, b)` with `a.dest_city == b.origin_city`, both
    /// non-canceled, ordered by `(a.duration + b.duration, a.id)` and capped
    /// at `limit`.
    async fn connecting_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<(Flight, Flight)>>;
}

/// Opens serializable transactions over accounts, capacities and
/// reservations.
#[async_trait]
pub trait TransactionalStore: Send + Sync + 'static {
    type Tx: StoreTransaction;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One serializable unit of work. Dropping a transaction without calling
/// [`StoreTransaction::commit`] discards every write made through it.
///
/// Any method may fail with [`StoreError::Conflict`]; the caller is expected
/// to abandon the transaction and replay the whole operation.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn flight(&mut self, id: FlightId) -> StoreResult<Option<Flight>>;

    async fn capacity(&mut self, id: FlightId) -> StoreResult<Option<i32>>;

    /// Returns `true` when a row was created, `false` if one already existed.
    async fn insert_capacity_if_absent(&mut self, id: FlightId, seats: i32) -> StoreResult<bool>;

    async fn set_capacity(&mut self, id: FlightId, seats: i32) -> StoreResult<()>;

    async fn account(&mut self, username: &str) -> StoreResult<Option<Account>>;

    /// Returns `false` without writing when the username is taken.
    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool>;

    async fn set_balance(&mut self, username: &str, balance: i64) -> StoreResult<()>;

    async fn reservation(&mut self, id: ReservationId) -> StoreResult<Option<Reservation>>;

    /// All reservations owned by `username`, canceled ones included, ordered by id.
    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>>;

    async fn has_active_reservation_on(
        &mut self,
        username: &str,
        day_of_month: i32,
    ) -> StoreResult<bool>;

    /// Advances the global reservation counter and returns the new value.
    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()>;

    async fn update_reservation_flags(
        &mut self,
        id: ReservationId,
        paid: bool,
        canceled: bool,
    ) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Commits `tx` when `outcome` succeeded and rolls it back otherwise.
///
/// A failed rollback is logged and swallowed so the caller still sees the
/// error that caused it.
pub async fn commit_or_rollback<X, T>(tx: X, outcome: CoreResult<T>) -> CoreResult<T>
where
    X: StoreTransaction,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed after {}", err);
            }
            Err(err)
        }
    }
}
