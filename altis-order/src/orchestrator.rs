use crate::events::ReservationObserver;
use crate::manager::ReservationStore;
use crate::models::{ReservationDetails, ReservationListing};
use altis_catalog::CapacityLedger;
use altis_core::identity::Session;
use altis_core::payment::AccountLedger;
use altis_core::repository::{commit_or_rollback, StoreTransaction, TransactionalStore};
use altis_core::retry::RetryPolicy;
use altis_core::{CoreError, CoreResult};
use altis_shared::{Flight, FlightId, Itinerary, Masked, Reservation, ReservationEvent, ReservationId};
use altis_store::BusinessRules;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs book, pay, list and cancel as single serializable transactions.
///
/// Every operation is replayed from scratch on a storage conflict, up to
/// the retry policy's limit. Observers hear about a change only after its
/// transaction has committed.
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    rules: BusinessRules,
    observer: Option<Arc<dyn ReservationObserver>>,
}

impl<S: TransactionalStore> TransactionCoordinator<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy, rules: BusinessRules) -> Self {
        Self {
            store,
            retry,
            rules,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReservationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Books itinerary `itinerary_index` of the session's last search.
    pub async fn book(&self, session: &Session, itinerary_index: i64) -> CoreResult<ReservationId> {
        let username = session.require_login()?;
        let itinerary = session.itinerary(itinerary_index)?;

        let reservation = self
            .retry
            .run("book", move || self.try_book(username, itinerary))
            .await
            .inspect_err(|e| {
                if e.is_booking_failure() {
                    warn!(session_id = %session.id(), itinerary_index, error = %e, "Booking refused");
                }
            })?;

        info!(
            reservation_id = %reservation.id,
            session_id = %session.id(),
            cost = reservation.cost,
            day = reservation.day_of_month,
            "Reservation booked"
        );
        self.notify(ReservationEvent::Booked {
            reservation_id: reservation.id,
            username: Masked::new(reservation.username.clone()),
            flights: reservation.flight_ids(),
            cost: reservation.cost,
            timestamp: Utc::now().timestamp(),
        });

        Ok(reservation.id)
    }

    async fn try_book(&self, username: &str, itinerary: &Itinerary) -> CoreResult<Reservation> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::book_in(&mut tx, username, itinerary).await;
        commit_or_rollback(tx, outcome).await
    }

    async fn book_in(tx: &mut S::Tx, username: &str, itinerary: &Itinerary) -> CoreResult<Reservation> {
        let day_of_month = itinerary.day_of_month();
        if ReservationStore::has_active_on_day(tx, username, day_of_month).await? {
            return Err(CoreError::SameDayConflict { day_of_month });
        }

        let legs = itinerary.flight_ids();
        for flight_id in &legs {
            if CapacityLedger::ensure_tracked(tx, *flight_id).await? <= 0 {
                return Err(CoreError::NoCapacity(*flight_id));
            }
        }
        for flight_id in &legs {
            CapacityLedger::decrement(tx, *flight_id).await?;
        }

        ReservationStore::create(tx, username, itinerary).await
    }

    /// Pays an unpaid reservation from the session user's balance and
    /// returns what is left.
    pub async fn pay(&self, session: &Session, reservation_id: ReservationId) -> CoreResult<i64> {
        let username = session.require_login()?;

        let (cost, remaining_balance) = self
            .retry
            .run("pay", move || self.try_pay(username, reservation_id))
            .await?;

        info!(%reservation_id, session_id = %session.id(), cost, remaining_balance, "Reservation paid");
        self.notify(ReservationEvent::Paid {
            reservation_id,
            amount: cost,
            remaining_balance,
            timestamp: Utc::now().timestamp(),
        });

        Ok(remaining_balance)
    }

    async fn try_pay(&self, username: &str, reservation_id: ReservationId) -> CoreResult<(i64, i64)> {
        let mut tx = self.store.begin().await?;
        let outcome = self.pay_in(&mut tx, username, reservation_id).await;
        commit_or_rollback(tx, outcome).await
    }

    async fn pay_in(
        &self,
        tx: &mut S::Tx,
        username: &str,
        reservation_id: ReservationId,
    ) -> CoreResult<(i64, i64)> {
        let mut reservation = ReservationStore::find(tx, reservation_id)
            .await?
            .filter(Reservation::is_payable)
            .filter(|r| self.visible_to(r, username))
            .ok_or_else(|| CoreError::ReservationNotFound {
                reservation_id,
                username: username.to_string(),
            })?;

        let remaining = AccountLedger::debit(tx, username, reservation.cost).await?;
        ReservationStore::mark_paid(tx, &mut reservation).await?;
        Ok((reservation.cost, remaining))
    }

    /// The session user's non-canceled reservations with their flights.
    pub async fn list_reservations(&self, session: &Session) -> CoreResult<ReservationListing> {
        let username = session.require_login()?;

        self.retry
            .run("list_reservations", move || self.try_list(username))
            .await
    }

    async fn try_list(&self, username: &str) -> CoreResult<ReservationListing> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::list_in(&mut tx, username).await;
        commit_or_rollback(tx, outcome).await
    }

    async fn list_in(tx: &mut S::Tx, username: &str) -> CoreResult<ReservationListing> {
        let reservations = ReservationStore::active_for(tx, username).await?;
        if reservations.is_empty() {
            return Ok(ReservationListing::Empty);
        }

        let mut details = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let first = load_flight(tx, reservation.first_flight).await?;
            let second = match reservation.second_flight {
                Some(id) => Some(load_flight(tx, id).await?),
                None => None,
            };
            details.push(ReservationDetails {
                reservation,
                first,
                second,
            });
        }

        Ok(ReservationListing::Reservations(details))
    }

    /// Cancels a reservation, returns its seats and refunds the session user.
    pub async fn cancel(&self, session: &Session, reservation_id: ReservationId) -> CoreResult<()> {
        let username = session.require_login()?;

        let refunded = self
            .retry
            .run("cancel", move || self.try_cancel(username, reservation_id))
            .await?;

        info!(%reservation_id, session_id = %session.id(), refunded, "Reservation canceled");
        self.notify(ReservationEvent::Canceled {
            reservation_id,
            refunded,
            timestamp: Utc::now().timestamp(),
        });

        Ok(())
    }

    async fn try_cancel(&self, username: &str, reservation_id: ReservationId) -> CoreResult<i64> {
        let mut tx = self.store.begin().await?;
        let outcome = self.cancel_in(&mut tx, username, reservation_id).await;
        commit_or_rollback(tx, outcome).await
    }

    async fn cancel_in(
        &self,
        tx: &mut S::Tx,
        username: &str,
        reservation_id: ReservationId,
    ) -> CoreResult<i64> {
        let mut reservation = ReservationStore::find(tx, reservation_id)
            .await?
            .filter(Reservation::is_active)
            .filter(|r| self.visible_to(r, username))
            .ok_or(CoreError::CancelFailed(reservation_id))?;

        let refund = if reservation.paid || self.rules.refund_unpaid_on_cancel {
            reservation.cost
        } else {
            0
        };
        if refund > 0 {
            AccountLedger::credit(tx, username, refund).await?;
        }

        for flight_id in reservation.flight_ids() {
            CapacityLedger::increment(tx, flight_id).await?;
        }
        ReservationStore::mark_canceled(tx, &mut reservation).await?;

        Ok(refund)
    }

    fn visible_to(&self, reservation: &Reservation, username: &str) -> bool {
        !self.rules.enforce_reservation_owner || reservation.is_owned_by(username)
    }

    fn notify(&self, event: ReservationEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

async fn load_flight<T: StoreTransaction>(tx: &mut T, id: FlightId) -> CoreResult<Flight> {
    tx.flight(id)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("reserved flight {} missing from catalog", id)))
}
