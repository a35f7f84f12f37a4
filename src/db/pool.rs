//! Connection pool for the telemetry database.
//!
//! SQLite runs in WAL mode so readers never wait on the writer; writers are
//! serialized by `BEGIN IMMEDIATE` transactions and wait up to the busy
//! timeout for the lock instead of failing.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::{StoreConfig, TelemetryError};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Per-connection pragmas applied whenever the pool opens a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Total connections (active + idle).
    pub connections: u32,
    /// Currently idle connections.
    pub idle_connections: u32,
}

/// Shared handle to the connection pool. Cloning is cheap and shares the
/// same underlying pool.
#[derive(Clone)]
pub struct DatabasePool {
    pool: Pool<ConnectionManager<SqliteConnection>>,
    database_url: String,
}

impl DatabasePool {
    /// Opens the pool, switches the database to WAL, applies pending
    /// migrations and verifies a connection can be used.
    ///
    /// Safe to call on an already migrated database; only missing
    /// migrations run.
    ///
    /// # Errors
    ///
    /// Returns a storage [`TelemetryError`] if the pool cannot be built, a
    /// migration fails, or the health check fails.
    #[instrument(skip(config), fields(database_url = %config.database_url()))]
    pub fn open(config: &StoreConfig) -> Result<Self, TelemetryError> {
        let manager = ConnectionManager::<SqliteConnection>::new(config.database_url().as_str());

        let pool = Pool::builder()
            .max_size(*config.max_connections())
            .min_idle(Some(*config.min_idle()))
            .connection_timeout(Duration::from_secs(*config.connection_timeout_secs()))
            .idle_timeout(config.idle_timeout_secs().map(Duration::from_secs))
            .max_lifetime(config.max_lifetime_secs().map(Duration::from_secs))
            .connection_customizer(Box::new(ConnectionPragmas {
                busy_timeout: Duration::from_millis(*config.busy_timeout_ms()),
            }))
            .build(manager)?;

        let handle = Self {
            pool,
            database_url: config.database_url().clone(),
        };

        {
            let mut conn = handle.get()?;
            conn.batch_execute("PRAGMA journal_mode = WAL;")?;
            let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                TelemetryError::storage(format!("Failed to run migrations: {}", e))
            })?;
            info!(applied = applied.len(), "Migrations applied");
        }

        handle.health_check()?;
        info!(
            max_connections = *config.max_connections(),
            "Database pool ready"
        );
        Ok(handle)
    }

    /// Checks out a connection, blocking until one is free or the
    /// connection timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns a storage [`TelemetryError`] on timeout.
    pub fn get(
        &self,
    ) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>, TelemetryError> {
        Ok(self.pool.get()?)
    }

    /// Runs a trivial query on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns a storage [`TelemetryError`] if no connection works.
    #[instrument(skip(self))]
    pub fn health_check(&self) -> Result<(), TelemetryError> {
        let mut conn = self.get()?;
        conn.batch_execute("SELECT 1")?;
        debug!("Database pool health check passed");
        Ok(())
    }

    /// Versions of every migration recorded as applied, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage [`TelemetryError`] if the migration table cannot
    /// be read.
    #[instrument(skip(self))]
    pub fn applied_migrations(&self) -> Result<Vec<String>, TelemetryError> {
        let mut conn = self.get()?;
        let mut versions: Vec<String> = conn
            .applied_migrations()
            .map_err(|e| TelemetryError::storage(format!("Failed to read migrations: {}", e)))?
            .into_iter()
            .map(|version| version.to_string())
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Pool statistics.
    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// The database this pool connects to.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Releases this handle. Connections close once the last clone is gone.
    #[instrument(skip(self), fields(database_url = %self.database_url))]
    pub fn close(self) {
        info!(connections = self.state().connections, "Closing database pool");
        drop(self);
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DatabasePool")
            .field("database_url", &self.database_url)
            .field("state", &self.state())
            .finish()
    }
}
