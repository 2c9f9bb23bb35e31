//! Connection pool lifecycle management.
//!
//! # Responsibilities
//! - Own a bounded set of live connections (idle + checked out ≤ max)
//! - Hand each connection to at most one caller at a time
//! - Fail fast outside the ready window
//! - Drain and terminate connections on close
//!
//! # Lifecycle
//! ```text
//! Uninitialized ──initialize──▶ Ready ──close──▶ Closed
//!                                 ▲                │
//!                                 └───initialize───┘   (fresh instance)
//! ```

use std::collections::{HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::MySqlConfig;
use crate::db::connector::Connector;
use crate::db::error::PoolError;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "db-conn-{}", self.0)
    }
}

/// Pool sizing and wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_size: usize,
    pub max_size: usize,
    pub acquire_timeout: Option<Duration>,
}

impl From<&MySqlConfig> for PoolSettings {
    fn from(config: &MySqlConfig) -> Self {
        Self {
            min_size: config.pool_min,
            max_size: config.pool_max,
            acquire_timeout: config.acquire_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Lifecycle state as reported by [`PoolManager::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolLifecycle {
    Uninitialized,
    Ready,
    Closed,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub state: PoolLifecycle,
    pub idle: usize,
    pub in_use: usize,
    pub max_size: usize,
}

enum PoolState<T> {
    Uninitialized,
    Ready(Arc<PoolInner<T>>),
    Closed,
}

struct IdleConnection<T> {
    id: ConnectionId,
    conn: T,
}

struct Slots<T> {
    idle: VecDeque<IdleConnection<T>>,
    checked_out: HashSet<ConnectionId>,
}

/// Result of handing a connection back to its pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckIn {
    Idle,
    NotCheckedOut,
    PoolClosed,
}

/// One ready pool instance. A closed instance is never reopened.
struct PoolInner<T> {
    permits: Arc<Semaphore>,
    slots: Mutex<Slots<T>>,
    closed: AtomicBool,
}

impl<T> PoolInner<T> {
    fn new(max_size: usize, idle: VecDeque<IdleConnection<T>>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_size)),
            slots: Mutex::new(Slots {
                idle,
                checked_out: HashSet::new(),
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn checkout_idle(&self) -> Option<(ConnectionId, T)> {
        let mut slots = self.slots();
        let idle = slots.idle.pop_front()?;
        let fresh = slots.checked_out.insert(idle.id);
        debug_assert!(fresh, "idle connection was also checked out");
        Some((idle.id, idle.conn))
    }

    fn register_new(&self, id: ConnectionId) {
        self.slots().checked_out.insert(id);
    }

    fn check_in(&self, id: ConnectionId, conn: T) -> CheckIn {
        let mut slots = self.slots();
        let was_out = slots.checked_out.remove(&id);
        if self.is_closed() {
            return CheckIn::PoolClosed;
        }
        if !was_out || slots.idle.iter().any(|c| c.id == id) {
            return CheckIn::NotCheckedOut;
        }
        slots.idle.push_back(IdleConnection { id, conn });
        CheckIn::Idle
    }

    fn forget(&self, id: ConnectionId) {
        self.slots().checked_out.remove(&id);
    }

    fn counts(&self) -> (usize, usize) {
        let slots = self.slots();
        (slots.idle.len(), slots.checked_out.len())
    }
}

const RETURNED: &str = "pooled connection used after being returned";

/// A connection checked out of the pool.
///
/// Derefs to the driver connection. Give it back with
/// [`PoolManager::release`]; dropping it has the same effect.
pub struct PooledConnection<T: Send + 'static> {
    id: ConnectionId,
    conn: Option<T>,
    pool: Arc<PoolInner<T>>,
    _permit: OwnedSemaphorePermit,
}

impl<T: Send + 'static> PooledConnection<T> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Drop the connection instead of returning it, e.g. after an I/O error.
    /// Frees its slot so a replacement can be opened.
    pub fn discard(mut self) {
        if self.conn.take().is_some() {
            self.pool.forget(self.id);
            tracing::debug!(connection_id = %self.id, "Discarded pooled connection");
        }
    }

    fn check_in(&mut self) -> Option<CheckIn> {
        let conn = self.conn.take()?;
        Some(self.pool.check_in(self.id, conn))
    }
}

impl<T: Send + 'static> Deref for PooledConnection<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.conn.as_ref().expect(RETURNED)
    }
}

impl<T: Send + 'static> DerefMut for PooledConnection<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.conn.as_mut().expect(RETURNED)
    }
}

impl<T: Send + 'static> Drop for PooledConnection<T> {
    fn drop(&mut self) {
        match self.check_in() {
            Some(CheckIn::Idle) => {
                tracing::trace!(connection_id = %self.id, "Connection returned on drop");
            }
            Some(CheckIn::PoolClosed) => {
                tracing::debug!(connection_id = %self.id, "Pool closed, connection discarded");
            }
            Some(CheckIn::NotCheckedOut) => {
                tracing::warn!(connection_id = %self.id, "Connection was not checked out, discarded");
            }
            None => {}
        }
    }
}

/// Owns the database connection pool for the lifetime of the process.
pub struct PoolManager<C: Connector> {
    connector: C,
    settings: PoolSettings,
    lifecycle: tokio::sync::Mutex<()>,
    state: RwLock<PoolState<C::Connection>>,
}

impl<C: Connector> PoolManager<C> {
    /// Create an uninitialized manager. No connection is opened until
    /// [`initialize`](Self::initialize).
    pub fn new(connector: C, settings: PoolSettings) -> Self {
        Self {
            connector,
            settings,
            lifecycle: tokio::sync::Mutex::new(()),
            state: RwLock::new(PoolState::Uninitialized),
        }
    }

    fn ready_inner(&self) -> Option<Arc<PoolInner<C::Connection>>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            PoolState::Ready(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready_inner().is_some()
    }

    /// Open `min_size` connections and transition to ready.
    ///
    /// A second call while ready is a no-op. Calling after `close` builds a
    /// fresh pool instance.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        let _guard = self.lifecycle.lock().await;

        if self.is_ready() {
            tracing::warn!("Connection pool already initialized");
            return Ok(());
        }

        let mut idle = VecDeque::with_capacity(self.settings.min_size);
        for _ in 0..self.settings.min_size {
            match self.connector.connect().await {
                Ok(conn) => idle.push_back(IdleConnection { id: ConnectionId::next(), conn }),
                Err(e) => {
                    tracing::error!(
                        target_db = %self.connector.target(),
                        error = %e,
                        "Failed to initialize connection pool"
                    );
                    for opened in idle {
                        if let Err(e) = self.connector.close(opened.conn).await {
                            tracing::error!(
                                connection_id = %opened.id,
                                error = %e,
                                "Failed to close connection during pool setup rollback"
                            );
                        }
                    }
                    return Err(PoolError::ConnectionSetup(e));
                }
            }
        }

        let inner = Arc::new(PoolInner::new(self.settings.max_size, idle));
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = PoolState::Ready(inner);

        tracing::info!(
            target_db = %self.connector.target(),
            min = self.settings.min_size,
            max = self.settings.max_size,
            "Database connection pool initialized"
        );
        self.report();
        Ok(())
    }

    /// Check out a connection, waiting while every slot is in use.
    pub async fn acquire(&self) -> Result<PooledConnection<C::Connection>, PoolError> {
        let inner = self.ready_inner().ok_or_else(|| {
            tracing::error!("Cannot acquire connection: pool not initialized");
            PoolError::NotInitialized
        })?;

        let permit = self.wait_for_permit(&inner).await?;
        if inner.is_closed() {
            return Err(PoolError::NotInitialized);
        }

        let (id, conn) = match inner.checkout_idle() {
            Some(reused) => reused,
            None => match self.connector.connect().await {
                Ok(conn) => {
                    let id = ConnectionId::next();
                    inner.register_new(id);
                    tracing::debug!(connection_id = %id, "Opened new pooled connection");
                    (id, conn)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to acquire connection");
                    return Err(PoolError::Acquisition(e));
                }
            },
        };

        let pooled = PooledConnection {
            id,
            conn: Some(conn),
            pool: inner,
            _permit: permit,
        };
        self.report();
        Ok(pooled)
    }

    async fn wait_for_permit(
        &self,
        inner: &PoolInner<C::Connection>,
    ) -> Result<OwnedSemaphorePermit, PoolError> {
        let acquire = inner.permits.clone().acquire_owned();
        let permit = match self.settings.acquire_timeout {
            None => acquire.await,
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!(timeout = ?limit, "Timed out waiting for a free connection");
                    return Err(PoolError::AcquireTimeout(limit));
                }
            },
        };
        // The semaphore is only closed by `close`.
        permit.map_err(|_| PoolError::NotInitialized)
    }

    /// Return a connection to the idle set.
    ///
    /// Outside the ready window, or for a connection that does not belong to
    /// the current pool instance, the connection is discarded with a warning.
    pub fn release(&self, mut conn: PooledConnection<C::Connection>) {
        let Some(inner) = self.ready_inner() else {
            tracing::warn!(connection_id = %conn.id, "Cannot release connection: pool not initialized");
            return;
        };
        if !Arc::ptr_eq(&inner, &conn.pool) {
            tracing::warn!(connection_id = %conn.id, "Connection belongs to a previous pool instance, discarded");
            return;
        }

        match conn.check_in() {
            Some(CheckIn::Idle) => {
                tracing::trace!(connection_id = %conn.id, "Connection released");
            }
            Some(CheckIn::NotCheckedOut) => {
                tracing::warn!(connection_id = %conn.id, "Connection was not checked out, discarded");
            }
            Some(CheckIn::PoolClosed) | None => {
                tracing::warn!(connection_id = %conn.id, "Cannot release connection: pool closed");
            }
        }
        drop(conn);
        self.report();
    }

    /// Liveness probe for monitoring. Never fails; returns false when the
    /// pool is not ready or the probe errors.
    pub async fn test_connection(&self) -> bool {
        if !self.is_ready() {
            tracing::warn!("Connection pool not initialized");
            return false;
        }

        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Connection health check failed");
                return false;
            }
        };

        match self.connector.ping(&mut *conn).await {
            Ok(()) => {
                self.release(conn);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Connection health check failed");
                conn.discard();
                false
            }
        }
    }

    /// Drain and terminate every idle connection and transition to closed.
    ///
    /// Connections still checked out are discarded when their holders give
    /// them back. Every connection is attempted even if some fail.
    pub async fn close(&self) -> Result<(), PoolError> {
        let _guard = self.lifecycle.lock().await;

        let inner = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *state, PoolState::Closed) {
                PoolState::Ready(inner) => inner,
                previous => {
                    *state = previous;
                    tracing::warn!("Connection pool not initialized, nothing to close");
                    return Ok(());
                }
            }
        };

        inner.closed.store(true, Ordering::SeqCst);
        inner.permits.close();

        let (drained, in_use): (Vec<_>, usize) = {
            let mut slots = inner.slots();
            (slots.idle.drain(..).collect(), slots.checked_out.len())
        };
        if in_use > 0 {
            tracing::warn!(in_use, "Closing pool with connections still checked out");
        }

        let total = drained.len();
        let results = join_all(drained.into_iter().map(|idle| {
            let id = idle.id;
            let closing = self.connector.close(idle.conn);
            async move { (id, closing.await) }
        }))
        .await;

        let mut failures = Vec::new();
        for (id, result) in results {
            if let Err(e) = result {
                tracing::error!(connection_id = %id, error = %e, "Failed to close connection");
                failures.push(e.to_string());
            }
        }
        self.report();

        if failures.is_empty() {
            tracing::info!(closed = total, "Connection pool closed successfully");
            Ok(())
        } else {
            let err = PoolError::Shutdown {
                failed: failures.len(),
                total,
                detail: failures.join("; "),
            };
            tracing::error!(error = %err, "Error closing connection pool");
            Err(err)
        }
    }

    /// Snapshot of lifecycle state and slot usage.
    pub fn status(&self) -> PoolStatus {
        let (state, idle, in_use) = match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            PoolState::Uninitialized => (PoolLifecycle::Uninitialized, 0, 0),
            PoolState::Closed => (PoolLifecycle::Closed, 0, 0),
            PoolState::Ready(inner) => {
                let (idle, in_use) = inner.counts();
                (PoolLifecycle::Ready, idle, in_use)
            }
        };
        PoolStatus {
            state,
            idle,
            in_use,
            max_size: self.settings.max_size,
        }
    }

    fn report(&self) {
        let status = self.status();
        metrics::record_pool_status(status.idle, status.in_use);
    }
}
