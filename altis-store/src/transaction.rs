use altis_core::repository::{StoreError, StoreResult, StoreTransaction};
use altis_shared::{Account, Flight, FlightId, Reservation, ReservationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::{PgPool, Postgres, Transaction};

/// SQLSTATE codes Postgres raises when a serializable transaction has to be
/// abandoned: serialization_failure and deadlock_detected.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

pub fn is_retryable_sqlstate(code: Option<&str>) -> bool {
    code.is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code))
}

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if is_retryable_sqlstate(db.code().as_deref()) => {
            StoreError::Conflict
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(err.to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Keyed updates must hit exactly one row; anything else means the row the
/// caller just read is gone.
fn require_single_row(result: &PgQueryResult, missing: impl FnOnce() -> String) -> StoreResult<()> {
    if result.rows_affected() == 1 {
        Ok(())
    } else {
        Err(StoreError::Corrupt(missing()))
    }
}

pub(crate) const FLIGHT_COLUMNS: &str = "fid, day_of_month, carrier_id, flight_num, origin_city, \
     dest_city, actual_time, capacity, price, canceled";

const RESERVATION_COLUMNS: &str =
    "rid, first_fid, second_fid, paid, canceled, cost, username, day_of_month, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    fid: i64,
    day_of_month: i32,
    carrier_id: String,
    flight_num: String,
    origin_city: String,
    dest_city: String,
    actual_time: i32,
    capacity: i32,
    price: i64,
    canceled: bool,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: FlightId(row.fid),
            day_of_month: row.day_of_month,
            carrier_id: row.carrier_id,
            flight_num: row.flight_num,
            origin_city: row.origin_city,
            dest_city: row.dest_city,
            duration_minutes: row.actual_time,
            capacity: row.capacity,
            price: row.price,
            canceled: row.canceled,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    username: String,
    password: String,
    balance: i64,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    rid: i64,
    first_fid: i64,
    second_fid: Option<i64>,
    paid: bool,
    canceled: bool,
    cost: i64,
    username: String,
    day_of_month: i32,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: ReservationId(row.rid),
            first_flight: FlightId(row.first_fid),
            second_flight: row.second_fid.map(FlightId),
            paid: row.paid,
            canceled: row.canceled,
            cost: row.cost,
            username: row.username,
            day_of_month: row.day_of_month,
            created_at: row.created_at,
        }
    }
}

/// A serializable Postgres transaction. Dropping it without committing
/// rolls it back.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgStoreTransaction {
    pub(crate) async fn begin(pool: &PgPool) -> StoreResult<Self> {
        let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self { tx })
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn flight(&mut self, id: FlightId) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE fid = $1",
            FLIGHT_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Flight::from))
    }

    async fn capacity(&mut self, id: FlightId) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT remaining FROM flight_capacities WHERE fid = $1")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_capacity_if_absent(&mut self, id: FlightId, seats: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO flight_capacities (fid, remaining) VALUES ($1, $2) ON CONFLICT (fid) DO NOTHING",
        )
        .bind(id.0)
        .bind(seats)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_capacity(&mut self, id: FlightId, seats: i32) -> StoreResult<()> {
        let result = sqlx::query("UPDATE flight_capacities SET remaining = $2 WHERE fid = $1")
            .bind(id.0)
            .bind(seats)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_single_row(&result, || format!("no capacity row for flight {}", id))
    }

    async fn account(&mut self, username: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT username, password, balance FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| Account::new(r.username, r.password, r.balance)))
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO accounts (username, password, balance) VALUES ($1, $2, $3) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&account.username)
        .bind(account.password.expose())
        .bind(account.balance)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_balance(&mut self, username: &str, balance: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET balance = $2 WHERE username = $1")
            .bind(username)
            .bind(balance)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_single_row(&result, || format!("no account row for {}", username))
    }

    async fn reservation(&mut self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE rid = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Reservation::from))
    }

    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE username = $1 ORDER BY rid",
            RESERVATION_COLUMNS
        ))
        .bind(username)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn has_active_reservation_on(
        &mut self,
        username: &str,
        day_of_month: i32,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reservations \
             WHERE username = $1 AND day_of_month = $2 AND NOT canceled)",
        )
        .bind(username)
        .bind(day_of_month)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId> {
        let id = sqlx::query_scalar::<_, i64>(
            "UPDATE reservation_sequence SET last_id = last_id + 1 RETURNING last_id",
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(ReservationId(id))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (rid, first_fid, second_fid, paid, canceled, cost, username, day_of_month, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reservation.id.0)
        .bind(reservation.first_flight.0)
        .bind(reservation.second_flight.map(|f| f.0))
        .bind(reservation.paid)
        .bind(reservation.canceled)
        .bind(reservation.cost)
        .bind(&reservation.username)
        .bind(reservation.day_of_month)
        .bind(reservation.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_reservation_flags(
        &mut self,
        id: ReservationId,
        paid: bool,
        canceled: bool,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE reservations SET paid = $2, canceled = $3 WHERE rid = $1")
            .bind(id.0)
            .bind(paid)
            .bind(canceled)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_single_row(&result, || format!("reservation {} vanished", id))
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
