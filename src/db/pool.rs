//! Bounded asynchronous connection pool.
//!
//! Connections are opened lazily up to `max_size`. A leased connection rides
//! inside a [`PooledConnection`] guard; dropping the guard parks the
//! connection for reuse, and [`PooledConnection::invalidate`] discards it so
//! a poisoned session is never handed to another request.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::PoolError;

/// Opens and vets connections on behalf of the pool.
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    /// The live session type handed to callers.
    type Connection: Send + 'static;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Connection, PoolError>;

    /// Cheap liveness check applied before reusing an idle connection.
    fn is_valid(&self, conn: &Self::Connection) -> bool;
}

/// Pool sizing and timeout configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrently open connections.
    pub max_size: usize,
    /// Connections opened eagerly by [`Pool::warm`].
    pub min_idle: usize,
    /// How long [`Pool::acquire`] waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            min_idle: 0,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

struct PoolInner<M: ManageConnection> {
    manager: M,
    config: PoolConfig,
    /// Permits bound the number of live connections; one is held for the
    /// whole lifetime of every lease.
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<M::Connection>>,
}

impl<M: ManageConnection> PoolInner<M> {
    fn idle(&self) -> MutexGuard<'_, VecDeque<M::Connection>> {
        // Only push/pop happen under this lock; recover from poisoning
        // instead of propagating a panic.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded connection pool. Cheap to clone; clones share state.
pub struct Pool<M: ManageConnection> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    /// Create an empty pool.
    pub fn new(manager: M, config: PoolConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_size));
        Self {
            inner: Arc::new(PoolInner {
                manager,
                config,
                permits,
                idle: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Open `min_idle` connections eagerly so the first requests skip the
    /// connect handshake. Intended for startup, after the readiness gate.
    pub async fn warm(&self) -> Result<(), PoolError> {
        for _ in 0..self.inner.config.min_idle {
            let conn = self.inner.manager.connect().await?;
            self.inner.idle().push_back(conn);
        }
        Ok(())
    }

    /// Lease a connection, waiting up to the configured acquire timeout.
    ///
    /// Reuses an idle connection when a healthy one is available, otherwise
    /// opens a new one; never exceeds `max_size` live connections. Waiters
    /// are woken in FIFO order as leases end.
    pub async fn acquire(&self) -> Result<PooledConnection<M>, PoolError> {
        let timeout = self.inner.config.acquire_timeout;
        let permit = match tokio::time::timeout(
            timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            // The semaphore is never closed, so both failure arms mean the
            // caller ran out of time.
            Ok(Err(_)) | Err(_) => return Err(PoolError::Exhausted { waited: timeout }),
        };

        while let Some(conn) = self.inner.idle().pop_front() {
            if self.inner.manager.is_valid(&conn) {
                return Ok(PooledConnection::new(conn, Arc::clone(&self.inner), permit));
            }
            debug!("discarding stale idle connection");
        }

        let conn = self.inner.manager.connect().await?;
        Ok(PooledConnection::new(conn, Arc::clone(&self.inner), permit))
    }
}

/// A leased connection.
///
/// Dropping the guard returns the connection to the pool, which also holds
/// when the owning request is cancelled mid-flight. A guard marked broken
/// via [`PooledConnection::invalidate`] is closed instead, freeing its slot
/// for a fresh connection.
pub struct PooledConnection<M: ManageConnection> {
    conn: Option<M::Connection>,
    pool: Arc<PoolInner<M>>,
    permit: Option<OwnedSemaphorePermit>,
    broken: bool,
}

impl<M: ManageConnection> std::fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("leased", &self.conn.is_some())
            .field("broken", &self.broken)
            .finish()
    }
}

impl<M: ManageConnection> PooledConnection<M> {
    fn new(conn: M::Connection, pool: Arc<PoolInner<M>>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            conn: Some(conn),
            pool,
            permit: Some(permit),
            broken: false,
        }
    }

    /// Mark the connection unusable; it is closed on drop rather than
    /// returned to the idle set.
    pub fn invalidate(&mut self) {
        self.broken = true;
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        // Some until drop.
        self.conn.as_ref().expect("connection already returned")
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already returned")
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if !self.broken && self.pool.manager.is_valid(&conn) {
                // Park the connection before releasing the permit so a
                // waiter woken by the release finds it.
                self.pool.idle().push_back(conn);
            }
        }
        drop(self.permit.take());
    }
}
