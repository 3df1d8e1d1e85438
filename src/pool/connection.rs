//! [`PoolConnection`]: a checked-out connection that returns itself to the pool on drop.
//!
//! A single guard type rather than a `Live`/`Floating` pair — the live-vs-idle distinction lives
//! in [`inner::Managed`](crate::pool::inner::Managed) instead.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::connection::PgConnection;
use crate::pool::inner::{Managed, PoolInner};

/// A [`PgConnection`] borrowed from a [`Pool`](crate::pool::Pool). Returned to the pool's idle
/// queue when dropped, unless explicitly consumed by [`PoolConnection::close`] or
/// [`PoolConnection::leak`].
pub struct PoolConnection {
    managed: Option<Managed>,
    pool: Arc<PoolInner>,
}

impl PoolConnection {
    pub(crate) fn new(managed: Managed, pool: Arc<PoolInner>) -> Self {
        Self { managed: Some(managed), pool }
    }

    /// Detaches this connection from the pool and shuts it down gracefully (`Terminate`, §4.4)
    /// instead of returning it to the idle queue. Frees the slot it held for a replacement
    /// connection to take.
    pub async fn close(mut self) -> crate::Result<()> {
        let managed = self.managed.take().expect("connection taken twice");
        self.pool.discard_without_terminate();
        managed.conn.close().await
    }

    /// Detaches the underlying [`PgConnection`] from the pool entirely, without closing it. The
    /// pool's size count is decremented as if the connection had been closed; the caller now owns
    /// it outright.
    pub fn leak(mut self) -> PgConnection {
        let managed = self.managed.take().expect("connection taken twice");
        self.pool.discard_without_terminate();
        managed.conn
    }
}

impl Deref for PoolConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.managed.as_ref().expect("connection taken twice").conn
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.managed.as_mut().expect("connection taken twice").conn
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if let Some(managed) = self.managed.take() {
            self.pool.release(managed);
        }
    }
}
