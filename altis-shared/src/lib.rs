//! Records shared by every Altis reservation crate.

pub mod models;
pub mod pii;

pub use models::{
    Account, Flight, FlightId, Itinerary, Reservation, ReservationEvent, ReservationId,
    ReservationStatus,
};
pub use pii::Masked;
