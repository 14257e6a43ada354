use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog key of a single flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(pub i64);

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the flight catalog. The reservation engine only reads these;
/// `canceled` is flipped by whoever maintains the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub day_of_month: i32,
    pub carrier_id: String,
    pub flight_num: String,
    pub origin_city: String,
    pub dest_city: String,
    pub duration_minutes: i32,
    /// Nominal seat count. Live availability is tracked separately by the
    /// capacity ledger.
    pub capacity: i32,
    pub price: i64,
    pub canceled: bool,
}

impl Flight {
    pub fn is_bookable(&self) -> bool {
        !self.canceled
    }

    pub fn serves(&self, origin_city: &str, dest_city: &str, day_of_month: i32) -> bool {
        self.origin_city == origin_city
            && self.dest_city == dest_city
            && self.day_of_month == day_of_month
    }
}
