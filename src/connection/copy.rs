//! `COPY` streaming (§4.4): `COPY ... FROM STDIN` accepts chunked input via [`PgCopyIn`];
//! `COPY ... TO STDOUT` streams raw output as a [`BoxStream`].
//!
//! Borrows the connection directly rather than through a generic `DerefMut` type parameter —
//! the pool (C7) checks a connection out as a plain `&mut PgConnection` guard, so there's no
//! extra generality to buy here.

use bytes::Bytes;
use futures_core::stream::BoxStream;
use tokio::io::{AsyncRead, AsyncReadExt};

use async_stream::try_stream;

use crate::connection::PgConnection;
use crate::error::{err_protocol, Error};
use crate::message::{Backend, CopyData, CopyDone, CopyFail};

/// Chunk size used by [`PgCopyIn::read_from`] when pulling from an arbitrary `AsyncRead`.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// A connection in `COPY FROM STDIN` streaming mode, returned by [`PgConnection::copy_in`].
///
/// [`Self::finish`] or [`Self::abort`] must be called to leave this mode; dropping without either
/// sends `CopyFail` so the connection is left usable rather than stuck mid-`COPY`.
#[must_use = "dropping a PgCopyIn aborts the COPY; call finish() or abort() explicitly"]
pub struct PgCopyIn<'c> {
    conn: Option<&'c mut PgConnection>,
    textual: bool,
}

impl PgConnection {
    /// Issues `statement` (expected to be a `COPY ... FROM STDIN ...`) and transitions the
    /// connection to streaming input mode.
    pub async fn copy_in(&mut self, statement: &str) -> crate::Result<PgCopyIn<'_>> {
        self.wait_until_ready().await?;
        self.stream.write(crate::message::Query(statement));
        self.pending_ready_for_query_count += 1;
        self.stream.flush().await?;

        let textual = match self.stream.recv().await? {
            Backend::CopyInResponse(response) => response.format == 0,
            other => return Err(err_protocol!("expected CopyInResponse, got {other:?}")),
        };

        Ok(PgCopyIn { conn: Some(self), textual })
    }

    /// Issues `statement` (expected to be a `COPY ... TO STDOUT ...`) and streams the raw `COPY`
    /// payload back, chunked however the server chooses to send it.
    pub fn copy_out<'c>(&'c mut self, statement: &'c str) -> BoxStream<'c, crate::Result<Bytes>> {
        Box::pin(try_stream! {
            self.wait_until_ready().await?;
            self.stream.write(crate::message::Query(statement));
            self.pending_ready_for_query_count += 1;
            self.stream.flush().await?;

            match self.stream.recv().await? {
                Backend::CopyOutResponse(_) => {}
                other => Err(err_protocol!("expected CopyOutResponse, got {other:?}"))?,
            }

            loop {
                match self.stream.recv().await? {
                    Backend::CopyData(bytes) => yield bytes,
                    Backend::CopyDone => {
                        match self.stream.recv().await? {
                            Backend::CommandComplete(_) => {}
                            other => Err(err_protocol!("expected CommandComplete after CopyDone, got {other:?}"))?,
                        }
                        match self.stream.recv().await? {
                            Backend::ReadyForQuery(ready) => {
                                self.handle_ready_for_query(ready)?;
                                break;
                            }
                            other => Err(err_protocol!("expected ReadyForQuery after CopyDone, got {other:?}"))?,
                        }
                    }
                    other => Err(err_protocol!("unexpected message during copy out: {other:?}"))?,
                }
            }
        })
    }
}

impl<'c> PgCopyIn<'c> {
    /// `true` if the server expects text/CSV formatted input rather than binary.
    pub fn is_textual(&self) -> bool {
        self.textual
    }

    /// Sends one chunk of `COPY` payload as-is; the caller is responsible for formatting it
    /// according to [`Self::is_textual`].
    pub async fn send(&mut self, data: &[u8]) -> crate::Result<()> {
        let conn = self.conn.as_deref_mut().expect("PgCopyIn: connection already taken");
        conn.stream.send(CopyData(data)).await
    }

    /// Streams `source` to completion in fixed-size chunks, without buffering it all in memory.
    pub async fn read_from(&mut self, mut source: impl AsyncRead + Unpin) -> crate::Result<()> {
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];

        loop {
            let read = source.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            self.send(&buf[..read]).await?;
        }

        Ok(())
    }

    /// Aborts the `COPY`, discarding anything sent so far. `reason` appears in the server's logs
    /// and in the `ErrorResponse` it answers with.
    pub async fn abort(mut self, reason: impl Into<String>) -> crate::Result<()> {
        let conn = self.conn.take().expect("PgCopyIn: connection already taken");
        let reason = reason.into();
        conn.stream.send(CopyFail(&reason)).await?;

        match conn.stream.recv().await {
            Ok(other) => Err(err_protocol!("expected an error response to CopyFail, got {other:?}")),
            Err(Error::Database(e)) if e.is_query_canceled() => match conn.stream.recv().await? {
                Backend::ReadyForQuery(ready) => conn.handle_ready_for_query(ready),
                other => Err(err_protocol!("expected ReadyForQuery after aborted COPY, got {other:?}")),
            },
            Err(e) => Err(e),
        }
    }

    /// Signals that the `COPY` stream is complete, returning the number of rows affected.
    pub async fn finish(mut self) -> crate::Result<u64> {
        let conn = self.conn.take().expect("PgCopyIn: connection already taken");
        conn.stream.send(CopyDone).await?;

        let affected = match conn.stream.recv().await? {
            Backend::CommandComplete(cc) => cc.affected_rows,
            other => return Err(err_protocol!("expected CommandComplete, got {other:?}")),
        };

        match conn.stream.recv().await? {
            Backend::ReadyForQuery(ready) => conn.handle_ready_for_query(ready)?,
            other => return Err(err_protocol!("expected ReadyForQuery, got {other:?}")),
        }

        Ok(affected)
    }
}

impl Drop for PgCopyIn<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.stream.write(CopyFail("PgCopyIn dropped without calling finish() or abort()"));
        }
    }
}
