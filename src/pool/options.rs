//! [`PoolOptions`]: the builder for a [`Pool`](crate::pool::Pool) (§4.7).
//!
//! A plain builder over `min_connections`, `max_connections`, `acquire_timeout`, `idle_timeout`,
//! `max_lifetime`, `test_before_acquire`, `after_connect`, and `fair` — no metrics-instrumentation
//! knobs here, since ambient logging is covered by `log::debug!` in
//! [`inner`](crate::pool::inner) directly.

use std::sync::Arc;
use std::time::Duration;

use futures_core::future::BoxFuture;

use crate::connection::PgConnection;
use crate::options::PgConnectOptions;
use crate::pool::Pool;

/// A hook run on every freshly opened connection, before it is ever handed out, e.g. to `SET`
/// session variables or register [`set_type_codec`](PgConnection::set_type_codec) overrides.
pub(crate) type ConnectHook = Arc<dyn for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, crate::Result<()>> + Send + Sync>;

/// Configuration for a [`Pool`](crate::pool::Pool): how many connections to keep around, how long
/// to wait for one, and how aggressively to retire idle or aging connections.
#[derive(Clone)]
pub struct PoolOptions {
    pub(crate) min_connections: u32,
    pub(crate) max_connections: u32,
    pub(crate) acquire_timeout: Duration,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) max_lifetime: Option<Duration>,
    /// Ping every connection before handing it out, not just ones that have been idle past
    /// `idle_timeout`.
    pub(crate) test_before_acquire: bool,
    pub(crate) after_connect: Option<ConnectHook>,
    /// Whether waiters are served in roughly the order they arrived, rather than whichever task
    /// the runtime happens to poll first when a connection is released. Backed by
    /// `event_listener`'s registration-ordered wakeups (§4.7).
    pub(crate) fair: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolOptions {
    pub fn new() -> Self {
        Self {
            min_connections: 0,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            test_before_acquire: false,
            after_connect: None,
            fair: true,
        }
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.idle_timeout = timeout.into();
        self
    }

    pub fn max_lifetime(mut self, lifetime: impl Into<Option<Duration>>) -> Self {
        self.max_lifetime = lifetime.into();
        self
    }

    pub fn test_before_acquire(mut self, test: bool) -> Self {
        self.test_before_acquire = test;
        self
    }

    pub fn fair(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    pub fn after_connect<F>(mut self, callback: F) -> Self
    where
        F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, crate::Result<()>> + Send + Sync + 'static,
    {
        self.after_connect = Some(Arc::new(callback));
        self
    }

    pub async fn connect(self, url: &str) -> crate::Result<Pool> {
        let options: PgConnectOptions = url.parse()?;
        self.connect_with(options).await
    }

    pub async fn connect_with(self, connect_options: PgConnectOptions) -> crate::Result<Pool> {
        Pool::with_options(connect_options, self).await
    }
}
