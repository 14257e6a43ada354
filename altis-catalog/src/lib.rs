pub mod inventory;

pub use inventory::{CapacityLedger, InventoryError};
