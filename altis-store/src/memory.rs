use altis_core::repository::{
    FlightCatalog, StoreError, StoreResult, StoreTransaction, TransactionalStore,
};
use altis_core::search::SearchRequest;
use altis_shared::{Account, Flight, FlightId, Reservation, ReservationId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct State {
    flights: BTreeMap<FlightId, Flight>,
    capacities: HashMap<FlightId, i32>,
    accounts: HashMap<String, Account>,
    reservations: BTreeMap<ReservationId, Reservation>,
    last_reservation_id: i64,
}

#[derive(Debug, Default)]
struct Shared {
    state: State,
    version: u64,
}

/// Process-local store for tests and embedding.
///
/// Transactions work on a private snapshot. A transaction that wrote
/// anything commits only if no other transaction committed since its
/// snapshot was taken; otherwise it fails with [`StoreError::Conflict`],
/// the same signal a serializable database gives.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flights(flights: impl IntoIterator<Item = Flight>) -> Self {
        let state = State {
            flights: flights.into_iter().map(|f| (f.id, f)).collect(),
            ..State::default()
        };

        Self {
            shared: Arc::new(Mutex::new(Shared { state, version: 0 })),
        }
    }

    pub async fn cancel_flight(&self, id: FlightId) -> bool {
        let mut shared = self.shared.lock().await;
        let Some(flight) = shared.state.flights.get_mut(&id) else {
            return false;
        };
        flight.canceled = true;
        shared.version += 1;
        true
    }

    /// Drops accounts, capacities and reservations and restarts the
    /// reservation counter. The flight schedule is kept.
    pub async fn clear(&self) {
        let mut shared = self.shared.lock().await;
        let flights = std::mem::take(&mut shared.state.flights);
        shared.state = State {
            flights,
            ..State::default()
        };
        shared.version += 1;
    }

    pub async fn remaining_seats(&self, id: FlightId) -> Option<i32> {
        self.shared.lock().await.state.capacities.get(&id).copied()
    }

    pub async fn balance_of(&self, username: &str) -> Option<i64> {
        self.shared
            .lock()
            .await
            .state
            .accounts
            .get(username)
            .map(|a| a.balance)
    }

    pub async fn reservation_count(&self) -> usize {
        self.shared.lock().await.state.reservations.len()
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> StoreResult<MemoryTransaction> {
        let (state, base_version) = {
            let shared = self.shared.lock().await;
            (shared.state.clone(), shared.version)
        };
        // Give concurrent sessions a chance to interleave with this one.
        tokio::task::yield_now().await;

        Ok(MemoryTransaction {
            shared: self.shared.clone(),
            base_version,
            state,
            dirty: false,
        })
    }
}

#[async_trait]
impl FlightCatalog for InMemoryStore {
    async fn direct_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<Flight>> {
        let shared = self.shared.lock().await;
        let mut found: Vec<Flight> = shared
            .state
            .flights
            .values()
            .filter(|f| f.is_bookable())
            .filter(|f| f.serves(&request.origin_city, &request.dest_city, request.day_of_month))
            .cloned()
            .collect();

        found.sort_by_key(|f| (f.duration_minutes, f.id));
        found.truncate(limit);
        Ok(found)
    }

    async fn connecting_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<(Flight, Flight)>> {
        let shared = self.shared.lock().await;
        let on_day: Vec<&Flight> = shared
            .state
            .flights
            .values()
            .filter(|f| f.is_bookable() && f.day_of_month == request.day_of_month)
            .collect();

        let mut pairs = Vec::new();
        for first in on_day.iter().filter(|f| f.origin_city == request.origin_city) {
            for second in on_day.iter().filter(|f| f.dest_city == request.dest_city) {
                if first.dest_city == second.origin_city {
                    pairs.push(((*first).clone(), (*second).clone()));
                }
            }
        }

        pairs.sort_by_key(|(a, b)| (a.duration_minutes + b.duration_minutes, a.id, b.id));
        pairs.truncate(limit);
        Ok(pairs)
    }
}

pub struct MemoryTransaction {
    shared: Arc<Mutex<Shared>>,
    base_version: u64,
    state: State,
    dirty: bool,
}

impl MemoryTransaction {
    fn reservation_mut(&mut self, id: ReservationId) -> StoreResult<&mut Reservation> {
        self.state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| StoreError::Corrupt(format!("reservation {} vanished", id)))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn flight(&mut self, id: FlightId) -> StoreResult<Option<Flight>> {
        Ok(self.state.flights.get(&id).cloned())
    }

    async fn capacity(&mut self, id: FlightId) -> StoreResult<Option<i32>> {
        Ok(self.state.capacities.get(&id).copied())
    }

    async fn insert_capacity_if_absent(&mut self, id: FlightId, seats: i32) -> StoreResult<bool> {
        if self.state.capacities.contains_key(&id) {
            return Ok(false);
        }
        self.state.capacities.insert(id, seats);
        self.dirty = true;
        Ok(true)
    }

    async fn set_capacity(&mut self, id: FlightId, seats: i32) -> StoreResult<()> {
        if seats < 0 {
            return Err(StoreError::Corrupt(format!("negative capacity for flight {}", id)));
        }
        self.state.capacities.insert(id, seats);
        self.dirty = true;
        Ok(())
    }

    async fn account(&mut self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self.state.accounts.get(username).cloned())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool> {
        if self.state.accounts.contains_key(&account.username) {
            return Ok(false);
        }
        self.state
            .accounts
            .insert(account.username.clone(), account.clone());
        self.dirty = true;
        Ok(true)
    }

    async fn set_balance(&mut self, username: &str, balance: i64) -> StoreResult<()> {
        let account = self
            .state
            .accounts
            .get_mut(username)
            .ok_or_else(|| StoreError::Corrupt(format!("no account row for {}", username)))?;
        account.balance = balance;
        self.dirty = true;
        Ok(())
    }

    async fn reservation(&mut self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        Ok(self.state.reservations.get(&id).cloned())
    }

    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .state
            .reservations
            .values()
            .filter(|r| r.is_owned_by(username))
            .cloned()
            .collect())
    }

    async fn has_active_reservation_on(
        &mut self,
        username: &str,
        day_of_month: i32,
    ) -> StoreResult<bool> {
        Ok(self
            .state
            .reservations
            .values()
            .any(|r| r.is_active() && r.is_owned_by(username) && r.day_of_month == day_of_month))
    }

    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId> {
        self.state.last_reservation_id += 1;
        self.dirty = true;
        Ok(ReservationId(self.state.last_reservation_id))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        if self.state.reservations.contains_key(&reservation.id) {
            return Err(StoreError::Corrupt(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        self.state
            .reservations
            .insert(reservation.id, reservation.clone());
        self.dirty = true;
        Ok(())
    }

    async fn update_reservation_flags(
        &mut self,
        id: ReservationId,
        paid: bool,
        canceled: bool,
    ) -> StoreResult<()> {
        let reservation = self.reservation_mut(id)?;
        reservation.paid = paid;
        reservation.canceled = canceled;
        self.dirty = true;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let mut shared = self.shared.lock().await;
        if shared.version != self.base_version {
            debug!(
                base_version = self.base_version,
                current_version = shared.version,
                "In-memory commit lost a race"
            );
            return Err(StoreError::Conflict);
        }

        shared.state = self.state;
        shared.version += 1;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(id: i64, origin: &str, dest: &str, duration: i32) -> Flight {
        Flight {
            id: FlightId(id),
            day_of_month: 7,
            carrier_id: "DL".to_string(),
            flight_num: format!("{}", 900 + id),
            origin_city: origin.to_string(),
            dest_city: dest.to_string(),
            duration_minutes: duration,
            capacity: 3,
            price: 150,
            canceled: false,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_account_if_absent(&Account::new("ann", "pw", 50)).await.unwrap());
        assert!(!tx.insert_account_if_absent(&Account::new("ann", "other", 0)).await.unwrap());

        assert_eq!(store.balance_of("ann").await, None);
        tx.commit().await.unwrap();
        assert_eq!(store.balance_of("ann").await, Some(50));
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_account_if_absent(&Account::new("ann", "pw", 50)).await.unwrap();
        }
        assert_eq!(store.balance_of("ann").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_writers_conflict() {
        let store = InMemoryStore::with_flights(vec![flight(1, "BOS", "LAX", 300)]);

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_capacity_if_absent(FlightId(1), 3).await.unwrap();
        second.insert_capacity_if_absent(FlightId(1), 3).await.unwrap();
        second.set_capacity(FlightId(1), 2).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Conflict)));
        assert_eq!(store.remaining_seats(FlightId(1)).await, Some(3));
    }

    #[tokio::test]
    async fn test_read_only_transaction_never_conflicts() {
        let store = InMemoryStore::new();
        let mut reader = store.begin().await.unwrap();

        let mut writer = store.begin().await.unwrap();
        writer.insert_account_if_absent(&Account::new("bo", "pw", 1)).await.unwrap();
        writer.commit().await.unwrap();

        assert!(reader.account("bo").await.unwrap().is_none());
        reader.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_reservation_counter_rolls_back_and_resets_on_clear() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.next_reservation_id().await.unwrap(), ReservationId(1));
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.next_reservation_id().await.unwrap(), ReservationId(1));
        assert_eq!(tx.next_reservation_id().await.unwrap(), ReservationId(2));
        tx.commit().await.unwrap();

        store.clear().await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.next_reservation_id().await.unwrap(), ReservationId(1));
    }

    #[tokio::test]
    async fn test_catalog_queries_skip_canceled_flights() {
        let store = InMemoryStore::with_flights(vec![
            flight(1, "BOS", "LAX", 300),
            flight(2, "BOS", "DEN", 100),
            flight(3, "DEN", "LAX", 150),
            flight(4, "BOS", "LAX", 280),
        ]);
        store.cancel_flight(FlightId(4)).await;

        let request = SearchRequest::new("BOS", "LAX", false, 7, 10);
        let direct = store.direct_flights(&request, 10).await.unwrap();
        assert_eq!(direct.iter().map(|f| f.id).collect::<Vec<_>>(), vec![FlightId(1)]);

        let pairs = store.connecting_flights(&request, 10).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0.id, pairs[0].1.id), (FlightId(2), FlightId(3)));
    }
}
