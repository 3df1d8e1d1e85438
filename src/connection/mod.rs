//! The protocol state machine and public connection type (C4/C6).
//!
//! State lives in a flat field layout (`process_id`/`secret_key`/`pending_ready_for_query_count`/
//! `transaction_status`), split across submodule boundaries (`establish`, `stream`, the
//! prepare/run pair here under `execute`), driving this crate's
//! [`TypeRegistry`](crate::types::registry::TypeRegistry) and eviction-aware [`StatementCache`].

mod auth;
mod cancel;
mod copy;
mod establish;
mod execute;
mod introspect;
mod listen;
mod stream;
mod transaction;

pub use cancel::PgCancelToken;
pub use transaction::{IsolationLevel, TransactionOptions};

pub use copy::PgCopyIn;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::{err_protocol, Error};
use crate::message::{Backend, ReadyForQuery, Terminate, TransactionStatus};
use crate::options::PgConnectOptions;
use crate::row::Column;
use crate::statement_cache::{Named, StatementCache};
use crate::types::registry::{CustomCodec, TypeRegistry};
use crate::types::Oid;

use stream::PgStream;

/// A prepared statement's server-side name and the metadata `Describe` reported for it.
pub(crate) struct PreparedStatement {
    pub(crate) name: String,
    pub(crate) param_types: Vec<Oid>,
    pub(crate) columns: Arc<[Column]>,
}

impl Named for PreparedStatement {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A single connection to a PostgreSQL server, speaking the frontend/backend wire protocol
/// directly.
///
/// Per §5, at most one operation may be in flight on a connection at a time; attempting a second
/// concurrent operation (e.g. via two clones of an `&mut PgConnection`, which the borrow checker
/// already prevents, or by polling two futures built from the same call site) fails with
/// [`Error::Interface`] rather than corrupting the stream.
pub struct PgConnection {
    stream: PgStream,
    connect_options: Arc<PgConnectOptions>,
    process_id: u32,
    secret_key: u32,
    transaction_status: TransactionStatus,
    transaction_depth: u32,
    /// Incremented once per `Sync`/unprepared `Query` sent, decremented on each `ReadyForQuery`
    /// received. `wait_until_ready` drains this before starting a new operation (§4.4).
    pending_ready_for_query_count: usize,
    statements: StatementCache<Arc<PreparedStatement>>,
    /// The name of the statement currently bound to a portal and being executed, if any — used
    /// to detect when a statement eviction must be deferred (§4.5).
    in_flight_statement: Option<String>,
    /// Evicted statements whose `Close` had to be deferred because they were in flight at
    /// eviction time; flushed the next time the connection goes idle.
    pending_closes: Vec<String>,
    types: TypeRegistry,
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("process_id", &self.process_id)
            .field("transaction_status", &self.transaction_status)
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    pub async fn connect(options: &PgConnectOptions) -> crate::Result<Self> {
        let started = std::time::Instant::now();
        let conn = Self::establish(options).await?;
        log::debug!(
            "established connection to {}:{} in {:?}",
            options.host,
            options.port,
            started.elapsed()
        );
        Ok(conn)
    }

    pub async fn connect_with(url: &str) -> crate::Result<Self> {
        let options: PgConnectOptions = url.parse()?;
        Self::connect(&options).await
    }

    /// The backend process ID, as reported at connect time. Used to build a `CancelRequest`.
    pub(crate) fn process_id(&self) -> u32 {
        self.process_id
    }

    pub(crate) fn secret_key(&self) -> u32 {
        self.secret_key
    }

    pub fn transaction_depth(&self) -> u32 {
        self.transaction_depth
    }

    pub fn is_in_transaction(&self) -> bool {
        self.transaction_depth > 0
    }

    /// Installs a per-connection override for how a single type OID is encoded/decoded
    /// (§4.2/§4.6). Applies immediately to every subsequent operation on this connection.
    pub fn set_type_codec(&mut self, oid: Oid, codec: CustomCodec) {
        self.types.set_custom_codec(oid, codec);
    }

    /// Drains any `ReadyForQuery` messages still owed to us from a prior `Sync`/simple query
    /// before starting a new operation, per the barrier discipline in §4.4/§5.
    async fn wait_until_ready(&mut self) -> crate::Result<()> {
        while self.pending_ready_for_query_count > 0 {
            match self.stream.recv().await? {
                Backend::ReadyForQuery(ready) => self.handle_ready_for_query(ready)?,
                other => return Err(err_protocol!("expected ReadyForQuery, got {other:?}")),
            }
        }

        self.flush_pending_closes().await
    }

    fn handle_ready_for_query(&mut self, ready: ReadyForQuery) -> crate::Result<()> {
        self.transaction_status = ready.status;
        self.pending_ready_for_query_count = self
            .pending_ready_for_query_count
            .checked_sub(1)
            .ok_or_else(|| err_protocol!("received more ReadyForQuery messages than we sent Sync/Query"))?;
        Ok(())
    }

    /// Sends `Close` for any statement eviction that had to be deferred while it was in flight
    /// (§4.5). Only safe to call once the connection is idle.
    async fn flush_pending_closes(&mut self) -> crate::Result<()> {
        if self.pending_closes.is_empty() {
            return Ok(());
        }

        for name in self.pending_closes.drain(..) {
            self.stream.write(crate::message::Close(crate::message::CloseTarget::Statement(&name)));
        }
        self.stream.write(crate::message::Sync);
        self.pending_ready_for_query_count += 1;
        self.stream.flush().await?;

        match self.stream.recv().await? {
            Backend::ReadyForQuery(ready) => self.handle_ready_for_query(ready),
            other => Err(err_protocol!("expected ReadyForQuery after deferred Close, got {other:?}")),
        }
    }

    /// Registers interest in `LISTEN`/`NOTIFY` traffic, issuing `LISTEN <channel>` and returning
    /// a receiver of every `NotificationResponse` the server sends from then on (on any channel;
    /// callers filter by [`crate::message::NotificationResponse::channel`]).
    pub async fn listen(&mut self, channel: &str) -> crate::Result<UnboundedReceiver<crate::message::NotificationResponse>> {
        self.listen_impl(channel).await
    }

    /// Graceful shutdown: flush a `Terminate` and let the socket close on drop (§4.4).
    pub async fn close(mut self) -> crate::Result<()> {
        self.wait_until_ready().await?;
        self.stream.write(Terminate);
        self.stream.flush().await?;
        Ok(())
    }

    /// Immediate shutdown with no `Terminate` message — for a connection already known to be
    /// broken (e.g. discarded by the pool after a failed health check).
    pub fn terminate(self) {
        drop(self);
    }

    /// A cheap round-trip used by the pool's health check (§4.7): `SELECT 1` over the simple
    /// query protocol, which also happens to drain any backlog and confirm the socket is alive.
    pub async fn ping(&mut self) -> crate::Result<()> {
        self.simple_query("SELECT 1").await?;
        Ok(())
    }
}
