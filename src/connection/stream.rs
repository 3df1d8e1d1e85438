//! The connection's framed message stream (§4.3/§4.4): wraps [`BufStream`] over a possibly-TLS
//! socket, and intercepts the three backend message kinds that can arrive unsolicited at any
//! time — `NotificationResponse`, `ParameterStatus`, `NoticeResponse` — before handing the rest
//! back to the caller.
//!
//! Decodes directly into this crate's tagged `Backend` enum, rather than a two-step
//! message-then-format decode.

use std::collections::BTreeMap;

use log::Level;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::PgDatabaseError;
use crate::io::{BufStream, Encode};
use crate::message::{Backend, NotificationResponse};
use crate::net::{self, MaybeTlsStream, Socket};
use crate::options::PgConnectOptions;

pub(crate) struct PgStream {
    inner: BufStream<MaybeTlsStream<Socket>>,
    /// Set by `listen()` once a caller has registered interest in notifications; until then,
    /// `NotificationResponse` messages are simply dropped (no one is listening).
    pub(crate) notifications: Option<UnboundedSender<NotificationResponse>>,
    pub(crate) parameter_statuses: BTreeMap<String, String>,
}

impl PgStream {
    pub(crate) async fn connect(options: &PgConnectOptions, host: &str, port: u16) -> crate::Result<Self> {
        let socket = if host.starts_with('/') {
            Socket::connect_uds(host, port).await?
        } else {
            Socket::connect_tcp(host, port).await?
        };

        let socket = net::maybe_upgrade(socket, options, host).await?;

        Ok(Self {
            inner: BufStream::new(socket),
            notifications: None,
            parameter_statuses: BTreeMap::new(),
        })
    }

    /// Appends a framed message without touching the socket.
    pub(crate) fn write<T: Encode>(&mut self, message: T) {
        self.inner.write(message);
    }

    /// A pre-framed message with no tag byte (`StartupMessage`, `CancelRequest`).
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) {
        self.inner.write_raw(bytes);
    }

    pub(crate) async fn flush(&mut self) -> crate::Result<()> {
        self.inner.flush().await
    }

    /// Writes and immediately flushes one message.
    pub(crate) async fn send<T: Encode>(&mut self, message: T) -> crate::Result<()> {
        self.write(message);
        self.flush().await
    }

    /// Reads the next message meant for the caller, transparently handling (and never
    /// returning) `ErrorResponse`, `NotificationResponse`, `ParameterStatus`, and
    /// `NoticeResponse` (§4.4's "asynchronous messages").
    pub(crate) async fn recv(&mut self) -> crate::Result<Backend> {
        loop {
            let (wire_tag, payload) = self.inner.recv_frame().await?;
            let message = Backend::decode(wire_tag, payload)?;

            match message {
                Backend::ErrorResponse(error) => return Err((*error).into()),

                Backend::NotificationResponse(notification) => {
                    if let Some(sender) = &self.notifications {
                        let _ = sender.send(notification);
                    }
                    continue;
                }

                Backend::ParameterStatus(status) => {
                    self.parameter_statuses.insert(status.name, status.value);
                    continue;
                }

                Backend::NoticeResponse(notice) => {
                    log_notice(&notice);
                    continue;
                }

                other => return Ok(other),
            }
        }
    }
}

/// Logs a `NoticeResponse` at a level derived from its PostgreSQL severity (§4.11), under a
/// dedicated target so callers can tune it independently of the rest of the crate's logging.
fn log_notice(notice: &PgDatabaseError) {
    let level = match notice.severity() {
        "ERROR" | "FATAL" | "PANIC" => Level::Error,
        "WARNING" => Level::Warn,
        "NOTICE" | "INFO" | "LOG" => Level::Info,
        "DEBUG" => Level::Debug,
        _ => Level::Trace,
    };

    log::log!(target: "pgcore::postgres::notice", level, "{}", notice.message());
}
