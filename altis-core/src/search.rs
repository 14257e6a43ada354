use crate::identity::Session;
use crate::repository::FlightCatalog;
use crate::CoreResult;
use altis_shared::{Flight, Itinerary};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub origin_city: String,
    pub dest_city: String,
    pub direct_only: bool,
    pub day_of_month: i32,
    pub max_results: usize,
}

impl SearchRequest {
    pub fn new(
        origin_city: impl Into<String>,
        dest_city: impl Into<String>,
        direct_only: bool,
        day_of_month: i32,
        max_results: usize,
    ) -> Self {
        Self {
            origin_city: origin_city.into(),
            dest_city: dest_city.into(),
            direct_only,
            day_of_month,
            max_results,
        }
    }
}

/// Result of a search. `NoMatch` is an ordinary outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Itineraries(Vec<Itinerary>),
    NoMatch,
}

impl SearchOutcome {
    pub fn itineraries(&self) -> &[Itinerary] {
        match self {
            Self::Itineraries(list) => list,
            Self::NoMatch => &[],
        }
    }
}

pub struct SearchEngine {
    catalog: Arc<dyn FlightCatalog>,
}

impl SearchEngine {
    pub fn new(catalog: Arc<dyn FlightCatalog>) -> Self {
        Self { catalog }
    }

    /// Finds up to `max_results` itineraries and installs them as the
    /// session's bookable itinerary list, replacing whatever an earlier
    /// search left there.
    pub async fn search(
        &self,
        session: &mut Session,
        request: &SearchRequest,
    ) -> CoreResult<SearchOutcome> {
        // A failed search must not leave the previous result bookable.
        session.replace_itineraries(Vec::new());

        if request.max_results == 0 {
            return Ok(SearchOutcome::NoMatch);
        }

        let mut direct = self
            .catalog
            .direct_flights(request, request.max_results)
            .await?;
        sort_direct(&mut direct, request.max_results);

        let itineraries = if request.direct_only {
            direct
                .into_iter()
                .enumerate()
                .map(|(index, flight)| Itinerary::direct(index, flight))
                .collect()
        } else {
            let mut connecting = self
                .catalog
                .connecting_flights(request, request.max_results)
                .await?;
            sort_connecting(&mut connecting, request.max_results);
            debug!(
                direct = direct.len(),
                connecting = connecting.len(),
                "Merging itinerary candidates"
            );
            merge_by_duration(direct, connecting, request.max_results)
        };

        info!(
            origin = %request.origin_city,
            destination = %request.dest_city,
            day = request.day_of_month,
            found = itineraries.len(),
            "Search completed"
        );

        if itineraries.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }

        session.replace_itineraries(itineraries.clone());
        Ok(SearchOutcome::Itineraries(itineraries))
    }
}

// The catalog promises this order already; re-sorting keeps ranking exact
// for adapters whose ordering is only approximate.
fn sort_direct(flights: &mut Vec<Flight>, limit: usize) {
    flights.sort_by_key(|f| (f.duration_minutes, f.id));
    flights.truncate(limit);
}

fn sort_connecting(pairs: &mut Vec<(Flight, Flight)>, limit: usize) {
    pairs.sort_by_key(|(a, b)| (a.duration_minutes + b.duration_minutes, a.id, b.id));
    pairs.truncate(limit);
}

/// Stable two-way merge on total duration. A direct itinerary is taken
/// whenever it is no longer than the next connecting one, so direct flights
/// win ties. Indices are assigned in emission order starting at 0.
pub fn merge_by_duration(
    direct: Vec<Flight>,
    connecting: Vec<(Flight, Flight)>,
    max_results: usize,
) -> Vec<Itinerary> {
    let mut merged = Vec::with_capacity(max_results.min(direct.len() + connecting.len()));
    let mut direct = direct.into_iter().peekable();
    let mut connecting = connecting.into_iter().peekable();

    while merged.len() < max_results {
        let take_direct = match (direct.peek(), connecting.peek()) {
            (Some(d), Some((a, b))) => d.duration_minutes <= a.duration_minutes + b.duration_minutes,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        let index = merged.len();
        let next = if take_direct {
            direct.next().map(|flight| Itinerary::direct(index, flight))
        } else {
            connecting
                .next()
                .map(|(first, second)| Itinerary::connecting(index, first, second))
        };

        match next {
            Some(itinerary) => merged.push(itinerary),
            None => break,
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StoreResult;
    use altis_shared::FlightId;
    use async_trait::async_trait;

    fn flight(id: i64, origin: &str, dest: &str, day: i32, duration: i32) -> Flight {
        Flight {
            id: FlightId(id),
            day_of_month: day,
            carrier_id: "AS".to_string(),
            flight_num: format!("{}", 100 + id),
            origin_city: origin.to_string(),
            dest_city: dest.to_string(),
            duration_minutes: duration,
            capacity: 10,
            price: 100,
            canceled: false,
        }
    }

    /// Naive catalog over a fixed flight list.
    struct StaticCatalog {
        flights: Vec<Flight>,
    }

    #[async_trait]
    impl FlightCatalog for StaticCatalog {
        async fn direct_flights(
            &self,
            request: &SearchRequest,
            limit: usize,
        ) -> StoreResult<Vec<Flight>> {
            let mut found: Vec<Flight> = self
                .flights
                .iter()
                .filter(|f| f.is_bookable())
                .filter(|f| f.serves(&request.origin_city, &request.dest_city, request.day_of_month))
                .cloned()
                .collect();
            found.sort_by_key(|f| (f.duration_minutes, f.id));
            found.truncate(limit);
            Ok(found)
        }

        async fn connecting_flights(
            &self,
            request: &SearchRequest,
            limit: usize,
        ) -> StoreResult<Vec<(Flight, Flight)>> {
            let mut pairs = Vec::new();
            for a in self.flights.iter().filter(|f| f.is_bookable()) {
                for b in self.flights.iter().filter(|f| f.is_bookable()) {
                    if a.origin_city == request.origin_city
                        && b.dest_city == request.dest_city
                        && a.dest_city == b.origin_city
                        && a.day_of_month == request.day_of_month
                        && b.day_of_month == request.day_of_month
                    {
                        pairs.push((a.clone(), b.clone()));
                    }
                }
            }
            pairs.sort_by_key(|(a, b)| (a.duration_minutes + b.duration_minutes, a.id));
            pairs.truncate(limit);
            Ok(pairs)
        }
    }

    fn engine(flights: Vec<Flight>) -> SearchEngine {
        SearchEngine::new(Arc::new(StaticCatalog { flights }))
    }

    #[tokio::test]
    async fn test_direct_and_connecting_are_merged_by_duration() {
        let engine = engine(vec![
            flight(1, "SEA", "JFK", 10, 360),
            flight(2, "SEA", "JFK", 10, 300),
            flight(3, "SEA", "ORD", 10, 200),
            flight(4, "ORD", "JFK", 10, 110),
        ]);
        let mut session = Session::new();

        let outcome = engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", false, 10, 3))
            .await
            .unwrap();

        let found = outcome.itineraries();
        assert_eq!(found.len(), 3);
        assert_eq!((found[0].first.id, found[0].total_duration), (FlightId(2), 300));
        assert!(found[0].is_direct());
        assert_eq!(found[1].flight_ids(), vec![FlightId(3), FlightId(4)]);
        assert_eq!(found[1].total_duration, 310);
        assert_eq!((found[2].first.id, found[2].total_duration), (FlightId(1), 360));
        assert_eq!(session.itineraries(), found);
    }

    #[tokio::test]
    async fn test_direct_wins_ties() {
        let engine = engine(vec![
            flight(1, "SEA", "ORD", 10, 100),
            flight(2, "ORD", "JFK", 10, 200),
            flight(3, "SEA", "JFK", 10, 300),
        ]);
        let mut session = Session::new();

        let outcome = engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", false, 10, 5))
            .await
            .unwrap();

        let found = outcome.itineraries();
        assert_eq!(found.len(), 2);
        assert!(found[0].is_direct());
        assert!(!found[1].is_direct());
        assert_eq!(found[0].total_duration, found[1].total_duration);
    }

    #[tokio::test]
    async fn test_direct_only_ignores_connections_and_skips_canceled() {
        let mut canceled = flight(5, "SEA", "JFK", 10, 10);
        canceled.canceled = true;
        let engine = engine(vec![
            canceled,
            flight(1, "SEA", "JFK", 10, 360),
            flight(3, "SEA", "ORD", 10, 20),
            flight(4, "ORD", "JFK", 10, 20),
        ]);
        let mut session = Session::new();

        let outcome = engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", true, 10, 5))
            .await
            .unwrap();

        let found = outcome.itineraries();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first.id, FlightId(1));
        assert_eq!(found[0].index, 0);
    }

    #[tokio::test]
    async fn test_no_match_clears_previous_results() {
        let engine = engine(vec![flight(1, "SEA", "JFK", 10, 360)]);
        let mut session = Session::new();

        engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", true, 10, 5))
            .await
            .unwrap();
        assert_eq!(session.itineraries().len(), 1);

        let outcome = engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", true, 11, 5))
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::NoMatch);
        assert!(session.itineraries().is_empty());
    }

    #[test]
    fn test_merge_drains_remaining_stream() {
        let direct = vec![flight(1, "A", "B", 1, 50)];
        let connecting = vec![
            (flight(2, "A", "C", 1, 10), flight(3, "C", "B", 1, 10)),
            (flight(4, "A", "D", 1, 30), flight(5, "D", "B", 1, 30)),
            (flight(6, "A", "E", 1, 40), flight(7, "E", "B", 1, 40)),
        ];

        let merged = merge_by_duration(direct, connecting, 10);
        let durations: Vec<i32> = merged.iter().map(|i| i.total_duration).collect();
        assert_eq!(durations, vec![20, 50, 60, 80]);
        let indices: Vec<usize> = merged.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_merge_respects_max_results() {
        let direct = vec![flight(1, "A", "B", 1, 50), flight(2, "A", "B", 1, 70)];
        let connecting = vec![(flight(3, "A", "C", 1, 10), flight(4, "C", "B", 1, 10))];

        let merged = merge_by_duration(direct, connecting, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].first.id, FlightId(1));
    }

    #[tokio::test]
    async fn test_unbounded_max_results_returns_every_itinerary() {
        let engine = engine(vec![
            flight(1, "SEA", "JFK", 10, 360),
            flight(2, "SEA", "JFK", 10, 300),
            flight(3, "SEA", "ORD", 10, 200),
            flight(4, "ORD", "JFK", 10, 110),
        ]);
        let mut session = Session::new();

        let outcome = engine
            .search(&mut session, &SearchRequest::new("SEA", "JFK", false, 10, usize::MAX))
            .await
            .unwrap();

        let durations: Vec<i32> = outcome.itineraries().iter().map(|i| i.total_duration).collect();
        assert_eq!(durations, vec![300, 310, 360]);
        assert_eq!(session.itineraries().len(), 3);
    }
}
