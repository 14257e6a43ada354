pub mod app_config;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod transaction;

pub use app_config::{BusinessRules, Config, DatabaseConfig};
pub use database::DbClient;
pub use flight_repo::PostgresFlightRepository;
pub use memory::{InMemoryStore, MemoryTransaction};
pub use transaction::PgStoreTransaction;
