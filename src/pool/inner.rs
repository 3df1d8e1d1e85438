//! The shared pool state (§4.7): an idle queue plus the bookkeeping needed to bound total
//! connection count, wake waiters fairly, and retire connections that have gone stale.
//!
//! Built around a lock-free `ArrayQueue` of idle connections paired with an `event_listener::Event`
//! for registration-ordered wakeups (`acquire`/`try_acquire`/`release`/`drain`), plus an
//! `AtomicU32` size guard so a connection counted against `max_connections` is always released
//! back exactly once, whether it's handed out, dropped, or discarded after a failed health check.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use event_listener::Event;

use crate::connection::PgConnection;
use crate::error::Error;
use crate::options::PgConnectOptions;
use crate::pool::connection::PoolConnection;
use crate::pool::options::PoolOptions;

/// A connection plus the instant it was opened, so `max_lifetime` can be enforced independently
/// of how many times the connection has cycled through the idle queue.
pub(crate) struct Managed {
    pub(crate) conn: PgConnection,
    opened_at: Instant,
}

struct IdleConn {
    managed: Managed,
    idle_since: Instant,
}

pub(crate) struct PoolInner {
    connect_options: PgConnectOptions,
    options: PoolOptions,
    idle: ArrayQueue<IdleConn>,
    idle_len: AtomicU32,
    size: AtomicU32,
    closed: AtomicBool,
    release_event: Event,
}

impl PoolInner {
    pub(crate) fn new(connect_options: PgConnectOptions, options: PoolOptions) -> Arc<Self> {
        let capacity = options.max_connections.max(1) as usize;

        Arc::new(Self {
            connect_options,
            idle: ArrayQueue::new(capacity),
            idle_len: AtomicU32::new(0),
            size: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            release_event: Event::new(),
            options,
        })
    }

    pub(crate) fn options(&self) -> &PoolOptions {
        &self.options
    }

    pub(crate) fn size(&self) -> u32 {
        self.size.load(Ordering::Acquire)
    }

    pub(crate) fn num_idle(&self) -> usize {
        self.idle_len.load(Ordering::Acquire) as usize
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits for and returns a usable connection, respecting `acquire_timeout` (§4.7). Tries an
    /// idle connection first (health-checking it per `test_before_acquire`/`idle_timeout`/
    /// `max_lifetime`), then opens a new one if under `max_connections`, and otherwise waits for
    /// a release notification.
    pub(crate) async fn acquire(self: &Arc<Self>) -> crate::Result<PoolConnection> {
        let deadline = Instant::now() + self.options.acquire_timeout;

        loop {
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            if let Some(idle) = self.try_pop_idle() {
                match self.validate_idle(idle).await {
                    Some(managed) => return Ok(self.attach(managed)),
                    None => continue,
                }
            }

            if self.try_reserve_slot() {
                return match self.open_new(deadline).await {
                    Ok(managed) => Ok(self.attach(managed)),
                    Err(e) => {
                        self.size.fetch_sub(1, Ordering::AcqRel);
                        self.release_event.notify(1);
                        Err(e)
                    }
                };
            }

            // At `max_connections` with nothing idle: register interest in the next release
            // before checking again, so a release racing with this check can't be missed (§4.7).
            let listener = self.release_event.listen();

            if self.num_idle() > 0 || self.size() < self.options.max_connections {
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::PoolTimedOut);
            }

            if tokio::time::timeout(remaining, listener).await.is_err() {
                return Err(Error::PoolTimedOut);
            }
        }
    }

    /// A non-blocking acquire: returns an idle connection immediately if one is available,
    /// without health-checking it, or `None` if the pool has nothing idle right now.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<PoolConnection> {
        if self.is_closed() {
            return None;
        }

        let idle = self.try_pop_idle()?;
        Some(self.attach(idle.managed))
    }

    fn try_pop_idle(&self) -> Option<IdleConn> {
        let popped = self.idle.pop();
        if popped.is_some() {
            self.idle_len.fetch_sub(1, Ordering::AcqRel);
        }
        popped
    }

    fn try_reserve_slot(&self) -> bool {
        self.size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < self.options.max_connections {
                    Some(n + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    async fn open_new(self: &Arc<Self>, deadline: Instant) -> crate::Result<Managed> {
        let remaining = deadline.saturating_duration_since(Instant::now());

        let mut conn = tokio::time::timeout(remaining, PgConnection::connect(&self.connect_options))
            .await
            .map_err(|_| Error::PoolTimedOut)??;

        if let Some(hook) = &self.options.after_connect {
            hook(&mut conn).await?;
        }

        Ok(Managed { conn, opened_at: Instant::now() })
    }

    async fn validate_idle(self: &Arc<Self>, idle: IdleConn) -> Option<Managed> {
        let IdleConn { mut managed, idle_since } = idle;

        if let Some(max_lifetime) = self.options.max_lifetime {
            if managed.opened_at.elapsed() > max_lifetime {
                log::debug!("pool: retiring a connection past its max_lifetime");
                self.discard(managed);
                return None;
            }
        }

        let should_ping =
            self.options.test_before_acquire || self.options.idle_timeout.map_or(false, |t| idle_since.elapsed() > t);

        if should_ping {
            if let Err(e) = managed.conn.ping().await {
                log::debug!("pool: discarding a connection that failed its health check: {e}");
                self.discard(managed);
                return None;
            }
            return Some(managed);
        }

        Some(managed)
    }

    fn attach(self: &Arc<Self>, managed: Managed) -> PoolConnection {
        PoolConnection::new(managed, Arc::clone(self))
    }

    /// Returns a connection to the idle queue, or — if it's mid-transaction — spawns a task to
    /// roll that transaction back first (§4.7: a pool connection is never handed out inside
    /// someone else's open transaction).
    pub(crate) fn release(self: &Arc<Self>, managed: Managed) {
        if self.is_closed() {
            self.discard(managed);
            return;
        }

        if managed.conn.is_in_transaction() {
            let pool = Arc::clone(self);
            tokio::spawn(async move { pool.release_after_rollback(managed).await });
            return;
        }

        self.release_idle(managed);
    }

    async fn release_after_rollback(self: Arc<Self>, mut managed: Managed) {
        if let Err(e) = managed.conn.rollback().await {
            log::warn!("pool: discarding a connection whose dangling transaction could not be rolled back: {e}");
            self.discard(managed);
            return;
        }

        self.release_idle(managed);
    }

    fn release_idle(&self, managed: Managed) {
        let idle = IdleConn { managed, idle_since: Instant::now() };

        if self.idle.push(idle).is_ok() {
            self.idle_len.fetch_add(1, Ordering::AcqRel);
            self.release_event.notify(1);
        } else {
            // The idle queue's capacity is `max_connections`, so this only fires if `size`
            // somehow overshot it; treat it the same as closing a connection outright.
            self.size.fetch_sub(1, Ordering::AcqRel);
            self.release_event.notify(1);
        }
    }

    pub(crate) fn discard(&self, managed: Managed) {
        managed.conn.terminate();
        self.discard_without_terminate();
    }

    /// Frees a pool slot for a connection the caller is taking ownership of (or closing) itself,
    /// via [`PoolConnection::close`](crate::pool::connection::PoolConnection::close) or
    /// [`PoolConnection::leak`](crate::pool::connection::PoolConnection::leak).
    pub(crate) fn discard_without_terminate(&self) {
        self.size.fetch_sub(1, Ordering::AcqRel);
        self.release_event.notify(1);
    }

    /// Opens connections until `min_connections` are idle and ready, logging (rather than
    /// failing) if the server is unreachable — a later `acquire` will surface the real error.
    pub(crate) async fn top_up_min_connections(self: &Arc<Self>) {
        while !self.is_closed() && self.size() < self.options.min_connections {
            if !self.try_reserve_slot() {
                break;
            }

            match self.open_new(Instant::now() + self.options.acquire_timeout).await {
                Ok(managed) => self.release_idle(managed),
                Err(e) => {
                    log::warn!("pool: failed to open a connection while maintaining min_connections: {e}");
                    self.size.fetch_sub(1, Ordering::AcqRel);
                    break;
                }
            }
        }
    }

    /// Marks the pool closed, wakes every waiter so they observe [`Error::PoolClosed`] instead of
    /// timing out, and terminates every currently idle connection. Connections checked out at the
    /// time of the call are terminated as they're returned, per [`Self::release`].
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.release_event.notify(usize::MAX);

        while let Some(idle) = self.try_pop_idle() {
            idle.managed.conn.terminate();
            self.size.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Background maintenance: periodically tops up `min_connections` and lets the next `acquire`
/// discover connections that aged out via `max_lifetime`/`idle_timeout` naturally. Exits once the
/// pool is dropped or closed.
pub(crate) fn spawn_maintenance(inner: &Arc<PoolInner>) {
    let weak = Arc::downgrade(inner);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(30)).await;

            let Some(inner) = weak.upgrade() else { break };
            if inner.is_closed() {
                break;
            }

            inner.top_up_min_connections().await;
        }
    });
}
