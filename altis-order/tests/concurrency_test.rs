//! Races between independent sessions sharing one store.

mod common;

use altis_core::CoreError;
use altis_shared::FlightId;
use common::{engine, init_tracing, logged_in, store};

async fn race_for_last_seat(racers: usize) -> (usize, usize) {
    init_tracing();
    let store = store();

    let mut engines = Vec::with_capacity(racers);
    for i in 0..racers {
        let mut engine = logged_in(&store, &format!("racer{}", i), 100).await;
        engine.search("SEA", "BOS", true, 11, 5).await.unwrap();
        engines.push(engine);
    }

    let handles: Vec<_> = engines
        .into_iter()
        .map(|engine| tokio::spawn(async move { engine.book(0).await }))
        .collect();

    let mut booked = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(CoreError::NoCapacity(id)) => {
                assert_eq!(id, FlightId(5));
                refused += 1;
            }
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }

    assert_eq!(store.remaining_seats(FlightId(5)).await, Some(0));
    assert_eq!(store.reservation_count().await, booked);
    (booked, refused)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_sessions_one_seat() {
    assert_eq!(race_for_last_seat(2).await, (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sixteen_sessions_one_seat() {
    assert_eq!(race_for_last_seat(16).await, (1, 15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_on_roomy_flight_all_succeed() {
    let store = store();

    let mut engines = Vec::new();
    for i in 0..5 {
        let mut engine = logged_in(&store, &format!("flyer{}", i), 100).await;
        engine.search("SEA", "JFK", true, 10, 1).await.unwrap();
        engines.push(engine);
    }

    let handles: Vec<_> = engines
        .into_iter()
        .map(|engine| tokio::spawn(async move { engine.book(0).await }))
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().0);
    }
    ids.sort_unstable();

    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.remaining_seats(FlightId(1)).await, Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_racing_two_day_ten_bookings_gets_one() {
    init_tracing();
    let store = store();

    let mut first = logged_in(&store, "dana", 500).await;
    let mut second = engine(&store);
    second.login("dana", "secret").await.unwrap();
    first.search("SEA", "JFK", false, 10, 3).await.unwrap();
    second.search("SEA", "JFK", false, 10, 3).await.unwrap();

    let fastest = tokio::spawn(async move { first.book(0).await });
    let slowest = tokio::spawn(async move { second.book(2).await });

    let outcomes = [fastest.await.unwrap(), slowest.await.unwrap()];
    let booked = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(booked, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(CoreError::SameDayConflict { day_of_month: 10 }))));
    assert_eq!(store.reservation_count().await, 1);
}
