use altis_shared::ReservationEvent;
use tracing::{info, warn};

/// Receives reservation events after the transaction that produced them has
/// committed. Observers must not block; they run on the caller's task.
pub trait ReservationObserver: Send + Sync {
    fn on_event(&self, event: &ReservationEvent);
}

/// Writes every event to the log as JSON.
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn render(event: &ReservationEvent) -> serde_json::Result<String> {
        serde_json::to_string(event)
    }
}

impl ReservationObserver for LoggingObserver {
    fn on_event(&self, event: &ReservationEvent) {
        match Self::render(event) {
            Ok(payload) => info!(
                reservation_id = %event.reservation_id(),
                kind = event.kind(),
                %payload,
                "Reservation event"
            ),
            Err(e) => warn!(error = %e, "Failed to serialize reservation event"),
        }
    }
}
