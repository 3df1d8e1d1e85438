//! Query cancellation (§4.4/§8): a second, unauthenticated connection sends a raw `CancelRequest`
//! packet carrying the target connection's process ID and secret key, which asks the server to
//! interrupt whatever that connection is currently running. The server answers by abandoning the
//! in-flight command with a `57014` (`query_canceled`) error on the *original* connection, once it
//! next checks for interrupts; the cancel connection itself gets no reply and is simply dropped.
//!
//! Modeled as a standalone, `Clone` token so it can be handed to another task without borrowing
//! the connection it cancels, rather than requiring an `Arc<Mutex<_>>`-wrapped shared connection
//! handle.

use std::sync::Arc;

use crate::connection::stream::PgStream;
use crate::connection::PgConnection;
use crate::message::CancelRequest;
use crate::options::PgConnectOptions;

/// A handle that can ask the server to cancel whatever [`PgConnection`] it was taken from is
/// currently running, from any task, without needing `&mut` access to that connection.
#[derive(Clone)]
pub struct PgCancelToken {
    connect_options: Arc<PgConnectOptions>,
    process_id: u32,
    secret_key: u32,
}

impl PgCancelToken {
    /// Opens a fresh connection to the same server and sends a `CancelRequest` for the
    /// connection this token was issued from, then closes it. Cancellation is best-effort: the
    /// server may have already finished the command, in which case this has no visible effect.
    pub async fn cancel_query(&self) -> crate::Result<()> {
        let mut stream = PgStream::connect(&self.connect_options, &self.connect_options.host, self.connect_options.port).await?;

        stream.write_raw(&CancelRequest {
            process_id: self.process_id,
            secret_key: self.secret_key,
        }
        .to_frame());

        stream.flush().await
    }
}

impl PgConnection {
    /// Issues a [`PgCancelToken`] that can later ask the server to cancel whatever this
    /// connection is running at the time, from another task (§8.8).
    pub fn cancel_token(&self) -> PgCancelToken {
        PgCancelToken {
            connect_options: Arc::clone(&self.connect_options),
            process_id: self.process_id(),
            secret_key: self.secret_key(),
        }
    }
}
