//! Pool lifecycle tests against an in-memory connector.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mysql_admin::db::{Connector, PoolError, PoolLifecycle, PoolManager, PoolSettings};

/// A fake server connection.
#[derive(Debug)]
struct FakeConn {
    serial: usize,
}

#[derive(Default)]
struct MockState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    fail_connect: AtomicBool,
    fail_ping: AtomicBool,
    fail_close: AtomicBool,
    /// Refuse connections once this many have been opened.
    refuse_after: Mutex<Option<usize>>,
}

/// In-memory connector; the test keeps a handle on the shared counters.
#[derive(Clone, Default)]
struct MockConnector(Arc<MockState>);

#[async_trait]
impl Connector for MockConnector {
    type Connection = FakeConn;

    async fn connect(&self) -> Result<FakeConn, sqlx::Error> {
        if self.0.fail_connect.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("connection refused".into()));
        }
        if let Some(limit) = *self.0.refuse_after.lock().unwrap() {
            if self.0.opened.load(Ordering::SeqCst) >= limit {
                return Err(sqlx::Error::Protocol("too many connections".into()));
            }
        }
        let serial = self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConn { serial })
    }

    async fn ping(&self, _conn: &mut FakeConn) -> Result<(), sqlx::Error> {
        if self.0.fail_ping.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("server gone away".into()));
        }
        Ok(())
    }

    async fn close(&self, _conn: FakeConn) -> Result<(), sqlx::Error> {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_close.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("close failed".into()));
        }
        Ok(())
    }

    fn target(&self) -> String {
        "mock@memory".to_string()
    }
}

fn settings(min: usize, max: usize) -> PoolSettings {
    PoolSettings {
        min_size: min,
        max_size: max,
        acquire_timeout: None,
    }
}

fn pool(min: usize, max: usize) -> (PoolManager<MockConnector>, Arc<MockState>) {
    let connector = MockConnector::default();
    let state = connector.0.clone();
    (PoolManager::new(connector, settings(min, max)), state)
}

#[tokio::test]
async fn acquire_before_initialize_fails_fast() {
    let (pool, connector) = pool(1, 2);

    assert!(matches!(pool.acquire().await, Err(PoolError::NotInitialized)));
    assert!(!pool.test_connection().await);
    assert_eq!(pool.status().state, PoolLifecycle::Uninitialized);
    assert_eq!(connector.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn initialize_and_close_are_idempotent() {
    let (pool, connector) = pool(2, 4);

    // Closing an uninitialized pool is a no-op.
    pool.close().await.unwrap();
    assert_eq!(pool.status().state, PoolLifecycle::Uninitialized);

    pool.initialize().await.unwrap();
    pool.initialize().await.unwrap();
    assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    assert_eq!(pool.status().idle, 2);

    pool.close().await.unwrap();
    pool.close().await.unwrap();
    assert_eq!(connector.closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.status().state, PoolLifecycle::Closed);
    assert!(matches!(pool.acquire().await, Err(PoolError::NotInitialized)));
}

#[tokio::test]
async fn initialize_after_close_builds_a_fresh_pool() {
    let (pool, connector) = pool(1, 2);
    pool.initialize().await.unwrap();
    let stale = pool.acquire().await.unwrap();
    pool.close().await.unwrap();

    pool.initialize().await.unwrap();
    assert_eq!(pool.status().state, PoolLifecycle::Ready);
    assert_eq!(connector.opened.load(Ordering::SeqCst), 2);

    // A handle from the previous instance is discarded, not adopted.
    pool.release(stale);
    let status = pool.status();
    assert_eq!(status.idle, 1);
    assert_eq!(status.in_use, 0);
}

#[tokio::test]
async fn setup_failure_surfaces_and_leaves_pool_uninitialized() {
    let (pool, connector) = pool(2, 4);
    connector.fail_connect.store(true, Ordering::SeqCst);

    assert!(matches!(pool.initialize().await, Err(PoolError::ConnectionSetup(_))));
    assert_eq!(pool.status().state, PoolLifecycle::Uninitialized);

    connector.fail_connect.store(false, Ordering::SeqCst);
    pool.initialize().await.unwrap();
    assert!(pool.is_ready());
}

#[tokio::test]
async fn partial_setup_is_rolled_back() {
    let (pool, connector) = pool(3, 3);
    *connector.refuse_after.lock().unwrap() = Some(2);
    // Rollback keeps going even when closing fails.
    connector.fail_close.store(true, Ordering::SeqCst);

    assert!(matches!(pool.initialize().await, Err(PoolError::ConnectionSetup(_))));
    assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.status().state, PoolLifecycle::Uninitialized);
}

#[tokio::test]
async fn acquisition_failure_is_reported() {
    let (pool, connector) = pool(0, 2);
    pool.initialize().await.unwrap();
    connector.fail_connect.store(true, Ordering::SeqCst);

    assert!(matches!(pool.acquire().await, Err(PoolError::Acquisition(_))));
    // The failed attempt does not consume a slot.
    connector.fail_connect.store(false, Ordering::SeqCst);
    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    pool.release(a);
    pool.release(b);
}

#[tokio::test]
async fn connections_are_exclusive_under_concurrency() {
    const MAX: usize = 4;
    let (pool, connector) = pool(1, MAX);
    pool.initialize().await.unwrap();
    let pool = Arc::new(pool);

    let holders = Arc::new(Mutex::new(HashSet::new()));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let pool = pool.clone();
        let holders = holders.clone();
        let peak = peak.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..5 {
                let conn = pool.acquire().await.unwrap();
                {
                    let mut held = holders.lock().unwrap();
                    assert!(held.insert(conn.serial), "connection handed out twice");
                    peak.fetch_max(held.len(), Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                holders.lock().unwrap().remove(&conn.serial);
                pool.release(conn);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= MAX);
    assert!(connector.opened.load(Ordering::SeqCst) <= MAX);
    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert!(status.idle <= MAX);
}

#[tokio::test]
async fn exhausted_pool_waits_for_release() {
    let (pool, _) = pool(1, 1);
    pool.initialize().await.unwrap();
    let pool = Arc::new(pool);

    let held = pool.acquire().await.unwrap();
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|c| c.serial) })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let held_id = held.serial;
    pool.release(held);
    let got = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(got, held_id);
}

#[tokio::test]
async fn bounded_wait_times_out() {
    let pool = PoolManager::new(
        MockConnector::default(),
        PoolSettings {
            min_size: 1,
            max_size: 1,
            acquire_timeout: Some(Duration::from_millis(50)),
        },
    );
    pool.initialize().await.unwrap();

    let _held = pool.acquire().await.unwrap();
    assert!(matches!(pool.acquire().await, Err(PoolError::AcquireTimeout(_))));
}

#[tokio::test]
async fn dropped_handle_returns_to_idle() {
    let (pool, _) = pool(1, 2);
    pool.initialize().await.unwrap();

    {
        let _conn = pool.acquire().await.unwrap();
        assert_eq!(pool.status().in_use, 1);
    }
    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.idle, 1);
}

#[tokio::test]
async fn discarded_handle_frees_its_slot() {
    let (pool, connector) = pool(1, 1);
    pool.initialize().await.unwrap();

    pool.acquire().await.unwrap().discard();
    assert_eq!(pool.status().idle, 0);

    let replacement = pool.acquire().await.unwrap();
    assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    pool.release(replacement);
}

#[tokio::test]
async fn test_connection_reports_probe_result() {
    let (pool, connector) = pool(1, 1);
    pool.initialize().await.unwrap();
    assert!(pool.test_connection().await);
    assert_eq!(pool.status().idle, 1);

    connector.fail_ping.store(true, Ordering::SeqCst);
    assert!(!pool.test_connection().await);
    // The broken connection was dropped rather than returned.
    assert_eq!(pool.status().idle, 0);
}

#[tokio::test]
async fn close_attempts_every_connection_and_reports_failures() {
    let (pool, connector) = pool(3, 3);
    pool.initialize().await.unwrap();
    connector.fail_close.store(true, Ordering::SeqCst);

    match pool.close().await {
        Err(PoolError::Shutdown { failed, total, .. }) => {
            assert_eq!(failed, 3);
            assert_eq!(total, 3);
        }
        other => panic!("unexpected close result: {other:?}"),
    }
    assert_eq!(connector.closed.load(Ordering::SeqCst), 3);
    assert_eq!(pool.status().state, PoolLifecycle::Closed);
}

#[tokio::test]
async fn release_after_close_discards() {
    let (pool, _) = pool(1, 2);
    pool.initialize().await.unwrap();
    let conn = pool.acquire().await.unwrap();
    pool.close().await.unwrap();

    pool.release(conn);
    assert_eq!(pool.status().state, PoolLifecycle::Closed);
}
