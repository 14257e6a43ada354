use altis_shared::{Flight, Reservation};
use serde::Serialize;

/// A reservation joined with the flights it holds seats on.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub first: Flight,
    pub second: Option<Flight>,
}

/// Result of listing a user's reservations. `Empty` is kept distinct so the
/// caller can tell "nothing booked" apart from an empty page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "reservations", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationListing {
    Empty,
    Reservations(Vec<ReservationDetails>),
}

impl ReservationListing {
    pub fn reservations(&self) -> &[ReservationDetails] {
        match self {
            Self::Empty => &[],
            Self::Reservations(list) => list,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
