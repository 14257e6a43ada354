pub mod identity;
pub mod payment;
pub mod repository;
pub mod retry;
pub mod search;

use altis_shared::{FlightId, ReservationId};
use repository::StoreError;

/// Every way a reservation-engine call can fail. The command layer renders
/// these; the engine never formats user-facing text itself.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("User already logged in")]
    AlreadyLoggedIn,
    #[error("Login failed")]
    InvalidCredentials,
    #[error("Username {0} is already taken")]
    DuplicateUsername(String),
    #[error("Initial balance must be non-negative, got {0}")]
    InvalidInitialBalance(i64),
    #[error("No such itinerary {0}")]
    NoSuchItinerary(i64),
    #[error("You cannot book two flights on day {day_of_month}")]
    SameDayConflict { day_of_month: i32 },
    #[error("Booking failed: no seats left on flight {0}")]
    NoCapacity(FlightId),
    #[error("Booking failed: {0}")]
    BookingFailed(String),
    #[error("Cannot find unpaid reservation {reservation_id} under user: {username}")]
    ReservationNotFound {
        reservation_id: ReservationId,
        username: String,
    },
    #[error("User has only {balance} in account but itinerary costs {cost}")]
    InsufficientFunds { balance: i64, cost: i64 },
    #[error("Failed to cancel reservation {0}")]
    CancelFailed(ReservationId),
    #[error("Transaction aborted by a concurrent update")]
    StorageConflict,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Only serialization conflicts are worth replaying from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict)
    }

    /// Both capacity exhaustion and other booking refusals count as a failed
    /// booking from the caller's point of view.
    pub fn is_booking_failure(&self) -> bool {
        matches!(self, Self::NoCapacity(_) | Self::BookingFailed(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::StorageConflict,
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
            StoreError::Corrupt(msg) => Self::StorageUnavailable(format!("corrupt data: {}", msg)),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
