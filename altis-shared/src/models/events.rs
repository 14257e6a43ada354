use crate::models::flight::FlightId;
use crate::models::reservation::ReservationId;
use crate::pii::Masked;
use serde::{Deserialize, Serialize};

/// Emitted once a reservation transaction has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationEvent {
    Booked {
        reservation_id: ReservationId,
        username: Masked<String>,
        flights: Vec<FlightId>,
        cost: i64,
        timestamp: i64,
    },
    Paid {
        reservation_id: ReservationId,
        amount: i64,
        remaining_balance: i64,
        timestamp: i64,
    },
    Canceled {
        reservation_id: ReservationId,
        refunded: i64,
        timestamp: i64,
    },
}

impl ReservationEvent {
    pub fn reservation_id(&self) -> ReservationId {
        match self {
            Self::Booked { reservation_id, .. }
            | Self::Paid { reservation_id, .. }
            | Self::Canceled { reservation_id, .. } => *reservation_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Booked { .. } => "BOOKED",
            Self::Paid { .. } => "PAID",
            Self::Canceled { .. } => "CANCELED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ReservationEvent::Canceled {
            reservation_id: ReservationId(7),
            refunded: 60,
            timestamp: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CANCELED");
        assert_eq!(json["reservation_id"], 7);
        assert_eq!(event.kind(), "CANCELED");
    }

    #[test]
    fn test_booked_event_masks_username_in_debug() {
        let event = ReservationEvent::Booked {
            reservation_id: ReservationId(1),
            username: Masked::new("alice".to_string()),
            flights: vec![FlightId(1)],
            cost: 100,
            timestamp: 0,
        };
        assert!(!format!("{:?}", event).contains("alice"));
        assert_eq!(event.reservation_id(), ReservationId(1));
    }
}
