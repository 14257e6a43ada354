pub mod account;
pub mod events;
pub mod flight;
pub mod itinerary;
pub mod reservation;

pub use account::Account;
pub use events::ReservationEvent;
pub use flight::{Flight, FlightId};
pub use itinerary::Itinerary;
pub use reservation::{Reservation, ReservationId, ReservationStatus};
