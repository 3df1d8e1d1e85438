//! The connection pool (C7, §4.7): a bounded set of [`PgConnection`]s handed out via
//! [`Pool::acquire`] and returned automatically when the [`PoolConnection`] guard drops.
//!
//! A `Pool`/`PoolOptions`/`PoolConnection` three-way split backed by a `crossbeam_queue::ArrayQueue`
//! + `event_listener::Event` idle-queue, concrete to this crate's single Postgres backend rather
//! than generic over an abstract `Database` trait.

mod connection;
mod inner;
mod options;

pub use connection::PoolConnection;
pub use options::PoolOptions;

use std::sync::Arc;

use crate::options::PgConnectOptions;
use inner::PoolInner;

/// A bounded pool of [`PgConnection`](crate::connection::PgConnection)s to one PostgreSQL server.
///
/// Cheaply [`Clone`]able (an `Arc` around the shared state); every clone shares the same idle
/// queue and connection count.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Connects with the default [`PoolOptions`] (10 max connections, no minimum).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        PoolOptions::new().connect(url).await
    }

    pub async fn connect_with(connect_options: PgConnectOptions) -> crate::Result<Self> {
        PoolOptions::new().connect_with(connect_options).await
    }

    pub(crate) async fn with_options(connect_options: PgConnectOptions, options: PoolOptions) -> crate::Result<Self> {
        let inner = PoolInner::new(connect_options, options);
        inner::spawn_maintenance(&inner);

        // Best-effort: get `min_connections` going immediately rather than waiting on the first
        // maintenance tick, but don't let a slow/unreachable server block `connect()` forever —
        // the maintenance loop will keep retrying either way.
        inner.top_up_min_connections().await;

        Ok(Self { inner })
    }

    /// Checks out a connection, waiting up to [`PoolOptions::acquire_timeout`] for one to become
    /// available (§4.7). Fails with [`crate::Error::PoolClosed`] if [`Pool::close`] has been
    /// called, or [`crate::Error::PoolTimedOut`] if the deadline elapses first.
    pub async fn acquire(&self) -> crate::Result<PoolConnection> {
        self.inner.acquire().await
    }

    /// Returns an idle connection immediately without waiting, or `None` if none is available —
    /// unlike [`Pool::acquire`], this never opens a new connection or health-checks the one it
    /// returns.
    pub fn try_acquire(&self) -> Option<PoolConnection> {
        self.inner.try_acquire()
    }

    /// The number of connections currently open, idle or checked out.
    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    /// The number of connections currently idle in the pool.
    pub fn num_idle(&self) -> usize {
        self.inner.num_idle()
    }

    pub fn options(&self) -> &PoolOptions {
        self.inner.options()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Marks the pool closed and terminates every idle connection; connections currently checked
    /// out are terminated as they're returned rather than recycled (§4.7). Waiters blocked in
    /// [`Pool::acquire`] wake immediately with [`crate::Error::PoolClosed`].
    pub fn close(&self) {
        self.inner.close();
    }
}
