use altis_core::repository::{StoreError, StoreTransaction};
use altis_core::CoreError;
use altis_shared::FlightId;
use tracing::debug;

/// Live seat availability per flight, kept apart from the catalog's nominal
/// capacity.
///
/// A flight gets a capacity record the first time someone tries to book it;
/// search and other read paths never create one. All methods run inside the
/// caller's transaction.
pub struct CapacityLedger;

impl CapacityLedger {
    /// Seeds the record from the flight's nominal capacity if it is missing.
    /// Returns the seats currently remaining.
    pub async fn ensure_tracked<T: StoreTransaction>(
        tx: &mut T,
        flight_id: FlightId,
    ) -> Result<i32, InventoryError> {
        if let Some(remaining) = tx.capacity(flight_id).await? {
            return Ok(remaining);
        }

        let flight = tx
            .flight(flight_id)
            .await?
            .ok_or(InventoryError::UnknownFlight(flight_id))?;

        let seats = flight.capacity.max(0);
        if tx.insert_capacity_if_absent(flight_id, seats).await? {
            debug!(%flight_id, seats, "Capacity record initialized");
            return Ok(seats);
        }

        // Lost an insert race inside the same transaction scope; read back.
        Self::remaining(tx, flight_id).await
    }

    pub async fn remaining<T: StoreTransaction>(
        tx: &mut T,
        flight_id: FlightId,
    ) -> Result<i32, InventoryError> {
        tx.capacity(flight_id)
            .await?
            .ok_or(InventoryError::NotTracked(flight_id))
    }

    /// Takes one seat. Fails with `NoCapacity` when none are left.
    pub async fn decrement<T: StoreTransaction>(
        tx: &mut T,
        flight_id: FlightId,
    ) -> Result<i32, InventoryError> {
        let remaining = Self::remaining(tx, flight_id).await?;
        if remaining <= 0 {
            return Err(InventoryError::NoCapacity(flight_id));
        }

        tx.set_capacity(flight_id, remaining - 1).await?;
        Ok(remaining - 1)
    }

    /// Gives one seat back. Only call this for a seat previously taken with
    /// [`CapacityLedger::decrement`].
    pub async fn increment<T: StoreTransaction>(
        tx: &mut T,
        flight_id: FlightId,
    ) -> Result<i32, InventoryError> {
        let remaining = Self::remaining(tx, flight_id).await?;
        tx.set_capacity(flight_id, remaining + 1).await?;
        Ok(remaining + 1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Flight {0} is not in the catalog")]
    UnknownFlight(FlightId),

    #[error("No capacity record for flight {0}")]
    NotTracked(FlightId),

    #[error("No seats left on flight {0}")]
    NoCapacity(FlightId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NoCapacity(flight_id) => CoreError::NoCapacity(flight_id),
            InventoryError::UnknownFlight(flight_id) => {
                CoreError::BookingFailed(format!("flight {} does not exist", flight_id))
            }
            InventoryError::NotTracked(flight_id) => {
                CoreError::Internal(format!("flight {} has no capacity record", flight_id))
            }
            InventoryError::Store(err) => err.into(),
        }
    }
}
