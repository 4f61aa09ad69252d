//! Database layer: connection pool, readiness gate, and item repository.
//!
//! - [`pool`]: bounded generic connection pool
//! - [`startup`]: bounded-retry schema readiness gate
//! - [`items`]: repository for the `items` table

pub mod items;
pub mod pool;
pub mod startup;

pub use items::{Item, ItemStore};
pub use pool::{ManageConnection, Pool, PoolConfig, PooledConnection};
pub use startup::{ensure_items_table, wait_ready, RetryPolicy};

use async_trait::async_trait;
use tokio_postgres::NoTls;
use tracing::warn;

use crate::error::PoolError;

/// Pool alias for the production PostgreSQL manager.
pub type PgPool = Pool<PgManager>;

/// Opens `tokio_postgres` sessions and spawns their connection drivers.
pub struct PgManager {
    config: tokio_postgres::Config,
}

impl PgManager {
    /// Create a manager from driver-level connection parameters.
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ManageConnection for PgManager {
    type Connection = tokio_postgres::Client;

    async fn connect(&self) -> Result<Self::Connection, PoolError> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| PoolError::Connect(e.to_string()))?;

        // The connection future owns the socket I/O; it resolves once the
        // client side hangs up.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("postgres connection terminated: {e}");
            }
        });

        Ok(client)
    }

    fn is_valid(&self, conn: &Self::Connection) -> bool {
        !conn.is_closed()
    }
}
