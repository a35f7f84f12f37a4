//! SQLite storage adapter: pool, embedded migrations and the repository
//! implementing every persistence port.

mod error;
mod models;
mod pool;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use pool::{DatabasePool, MIGRATIONS, PoolState};
pub use repository::TelemetryRepository;
