use altis_core::repository::StoreTransaction;
use altis_core::{CoreError, CoreResult};
use altis_shared::{Itinerary, Reservation, ReservationId, ReservationStatus};
use chrono::Utc;

/// Reservation records and their Booked → Paid → Canceled transitions.
///
/// Stateless; every call runs inside the caller's transaction so a status
/// change commits together with the seat and balance changes behind it.
pub struct ReservationStore;

impl ReservationStore {
    pub async fn has_active_on_day<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
        day_of_month: i32,
    ) -> CoreResult<bool> {
        Ok(tx.has_active_reservation_on(username, day_of_month).await?)
    }

    /// Allocates the next reservation id and records an unpaid reservation
    /// for `itinerary`.
    pub async fn create<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
        itinerary: &Itinerary,
    ) -> CoreResult<Reservation> {
        let id = tx.next_reservation_id().await?;

        let reservation = Reservation {
            id,
            first_flight: itinerary.first.id,
            second_flight: itinerary.second.as_ref().map(|f| f.id),
            paid: false,
            canceled: false,
            cost: itinerary.total_cost,
            username: username.to_string(),
            day_of_month: itinerary.day_of_month(),
            created_at: Utc::now(),
        };

        tx.insert_reservation(&reservation).await?;
        Ok(reservation)
    }

    pub async fn find<T: StoreTransaction>(
        tx: &mut T,
        id: ReservationId,
    ) -> CoreResult<Option<Reservation>> {
        Ok(tx.reservation(id).await?)
    }

    /// The user's non-canceled reservations in id order.
    pub async fn active_for<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
    ) -> CoreResult<Vec<Reservation>> {
        let mut reservations = tx.reservations_for(username).await?;
        reservations.retain(Reservation::is_active);
        reservations.sort_by_key(|r| r.id);
        Ok(reservations)
    }

    /// Transition: Booked → Paid
    pub async fn mark_paid<T: StoreTransaction>(
        tx: &mut T,
        reservation: &mut Reservation,
    ) -> CoreResult<()> {
        if reservation.status() != ReservationStatus::Booked {
            return Err(invalid_transition(reservation, ReservationStatus::Paid));
        }

        tx.update_reservation_flags(reservation.id, true, false).await?;
        reservation.paid = true;
        Ok(())
    }

    /// Transition: Booked | Paid → Canceled. Clears the paid flag.
    pub async fn mark_canceled<T: StoreTransaction>(
        tx: &mut T,
        reservation: &mut Reservation,
    ) -> CoreResult<()> {
        if reservation.status() == ReservationStatus::Canceled {
            return Err(invalid_transition(reservation, ReservationStatus::Canceled));
        }

        tx.update_reservation_flags(reservation.id, false, true).await?;
        reservation.paid = false;
        reservation.canceled = true;
        Ok(())
    }
}

fn invalid_transition(reservation: &Reservation, to: ReservationStatus) -> CoreError {
    CoreError::Internal(format!(
        "reservation {} cannot move from {:?} to {:?}",
        reservation.id,
        reservation.status(),
        to
    ))
}
