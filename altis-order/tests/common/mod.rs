#![allow(dead_code)]

use altis_core::repository::FlightCatalog;
use altis_core::retry::RetryPolicy;
use altis_order::FlightEngine;
use altis_shared::{Flight, FlightId};
use altis_store::{BusinessRules, InMemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "altis_order=debug,altis_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn flight(id: i64, origin: &str, dest: &str, day: i32, duration: i32, capacity: i32, price: i64) -> Flight {
    Flight {
        id: FlightId(id),
        day_of_month: day,
        carrier_id: "AS".to_string(),
        flight_num: format!("{}", 1000 + id),
        origin_city: origin.to_string(),
        dest_city: dest.to_string(),
        duration_minutes: duration,
        capacity,
        price,
        canceled: false,
    }
}

/// Day 10 SEA -> JFK searched with max 3 yields, in order:
/// 0: flight 1 direct (300 min, 70)
/// 1: flights 2 + 3 (310 min, 60)
/// 2: flight 4 direct (360 min, 90)
pub fn schedule() -> Vec<Flight> {
    vec![
        flight(1, "SEA", "JFK", 10, 300, 5, 70),
        flight(2, "SEA", "ORD", 10, 200, 5, 25),
        flight(3, "ORD", "JFK", 10, 110, 5, 35),
        flight(4, "SEA", "JFK", 10, 360, 5, 90),
        flight(5, "SEA", "BOS", 11, 250, 1, 40),
        flight(6, "SEA", "JFK", 12, 300, 5, 50),
    ]
}

pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_flights(schedule()))
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(64)
        .with_initial_delay(Duration::from_millis(1))
}

pub fn engine(store: &Arc<InMemoryStore>) -> FlightEngine<InMemoryStore> {
    engine_with(store, BusinessRules::default())
}

pub fn engine_with(store: &Arc<InMemoryStore>, rules: BusinessRules) -> FlightEngine<InMemoryStore> {
    let catalog: Arc<dyn FlightCatalog> = store.clone();
    FlightEngine::new(store.clone(), catalog, fast_retry(), rules)
}

/// Creates `username` with `balance` and returns an engine logged in as them.
pub async fn logged_in(store: &Arc<InMemoryStore>, username: &str, balance: i64) -> FlightEngine<InMemoryStore> {
    let mut engine = engine(store);
    engine.create_account(username, "secret", balance).await.unwrap();
    engine.login(username, "secret").await.unwrap();
    engine
}
