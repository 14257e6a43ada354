use crate::models::flight::{Flight, FlightId};
use serde::{Deserialize, Serialize};

/// One or two same-day legs offered to the session as a single bookable unit.
///
/// Itineraries only live inside a session's search cache; `index` is the
/// position in the most recent search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub index: usize,
    pub first: Flight,
    pub second: Option<Flight>,
    pub total_cost: i64,
    pub total_duration: i32,
}

impl Itinerary {
    pub fn direct(index: usize, flight: Flight) -> Self {
        Self {
            index,
            total_cost: flight.price,
            total_duration: flight.duration_minutes,
            first: flight,
            second: None,
        }
    }

    pub fn connecting(index: usize, first: Flight, second: Flight) -> Self {
        Self {
            index,
            total_cost: first.price + second.price,
            total_duration: first.duration_minutes + second.duration_minutes,
            first,
            second: Some(second),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.second.is_none()
    }

    pub fn legs(&self) -> impl Iterator<Item = &Flight> {
        std::iter::once(&self.first).chain(self.second.iter())
    }

    pub fn flight_ids(&self) -> Vec<FlightId> {
        self.legs().map(|flight| flight.id).collect()
    }

    pub fn day_of_month(&self) -> i32 {
        self.first.day_of_month
    }
}
