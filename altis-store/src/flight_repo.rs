use crate::transaction::{map_sqlx_error, FlightRow, FLIGHT_COLUMNS};
use altis_core::repository::{FlightCatalog, StoreResult};
use altis_core::search::SearchRequest;
use altis_shared::{Flight, FlightId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Flight schedule queries for search. Reads go straight to the pool; the
/// schedule is not written by reservation traffic.
pub struct PostgresFlightRepository {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl FlightCatalog for PostgresFlightRepository {
    async fn direct_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            r#"
            SELECT {}
            FROM flights
            WHERE origin_city = $1
              AND dest_city = $2
              AND day_of_month = $3
              AND NOT canceled
            ORDER BY actual_time, fid
            LIMIT $4
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(&request.origin_city)
        .bind(&request.dest_city)
        .bind(request.day_of_month)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn connecting_flights(
        &self,
        request: &SearchRequest,
        limit: usize,
    ) -> StoreResult<Vec<(Flight, Flight)>> {
        // 1. Rank the leg pairs
        let pairs = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT f1.fid, f2.fid
            FROM flights f1
            JOIN flights f2 ON f1.dest_city = f2.origin_city
            WHERE f1.origin_city = $1
              AND f2.dest_city = $2
              AND f1.day_of_month = $3
              AND f2.day_of_month = $3
              AND NOT f1.canceled
              AND NOT f2.canceled
            ORDER BY f1.actual_time + f2.actual_time, f1.fid, f2.fid
            LIMIT $4
            "#,
        )
        .bind(&request.origin_city)
        .bind(&request.dest_city)
        .bind(request.day_of_month)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        // 2. Load every referenced flight once
        let ids: Vec<i64> = pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE fid = ANY($1)",
            FLIGHT_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let flights: HashMap<FlightId, Flight> = rows
            .into_iter()
            .map(Flight::from)
            .map(|f| (f.id, f))
            .collect();

        Ok(pairs
            .into_iter()
            .filter_map(|(a, b)| {
                let first = flights.get(&FlightId(a))?.clone();
                let second = flights.get(&FlightId(b))?.clone();
                Some((first, second))
            })
            .collect())
    }
}

// Postgres rejects a negative LIMIT, so oversized limits saturate.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
