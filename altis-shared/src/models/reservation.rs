use crate::models::flight::FlightId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Global reservation number. Allocated from a single counter starting at 1
/// and never handed out twice, even after cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub i64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle position derived from the `paid` / `canceled` flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Booked,
    Paid,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub first_flight: FlightId,
    pub second_flight: Option<FlightId>,
    pub paid: bool,
    pub canceled: bool,
    pub cost: i64,
    pub username: String,
    pub day_of_month: i32,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn status(&self) -> ReservationStatus {
        if self.canceled {
            ReservationStatus::Canceled
        } else if self.paid {
            ReservationStatus::Paid
        } else {
            ReservationStatus::Booked
        }
    }

    pub fn is_active(&self) -> bool {
        !self.canceled
    }

    pub fn is_payable(&self) -> bool {
        !self.paid && !self.canceled
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.username == username
    }

    pub fn flight_ids(&self) -> Vec<FlightId> {
        std::iter::once(self.first_flight)
            .chain(self.second_flight)
            .collect()
    }
}
