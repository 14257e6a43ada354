pub mod engine;
pub mod events;
pub mod manager;
pub mod models;
pub mod orchestrator;

pub use engine::FlightEngine;
pub use events::{LoggingObserver, ReservationObserver};
pub use manager::ReservationStore;
pub use models::{ReservationDetails, ReservationListing};
pub use orchestrator::TransactionCoordinator;
