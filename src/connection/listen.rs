//! `LISTEN`/`NOTIFY` support (§4.4): registers a channel of interest and hands back a receiver
//! of every `NotificationResponse` the server delivers from then on, on any channel the caller
//! has `LISTEN`ed to.
//!
//! A single receiver per connection — one `listen()` call replaces any receiver from a prior
//! call — rather than a broadcast channel shared across a pool of dedicated listener
//! connections.

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::connection::PgConnection;
use crate::message::NotificationResponse;

impl PgConnection {
    pub(crate) async fn listen_impl(&mut self, channel: &str) -> crate::Result<UnboundedReceiver<NotificationResponse>> {
        // `LISTEN` takes an identifier, not a string literal; quoting it here lets callers pass
        // an arbitrary channel name without worrying about SQL identifier rules themselves.
        self.simple_query(&format!("LISTEN {}", quote_identifier(channel))).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        self.stream.notifications = Some(sender);

        Ok(receiver)
    }

    /// Stops delivering notifications for `channel` and drops it from the server's listen set.
    pub async fn unlisten(&mut self, channel: &str) -> crate::Result<()> {
        self.simple_query(&format!("UNLISTEN {}", quote_identifier(channel))).await?;
        Ok(())
    }

    /// Sends a `NOTIFY` on `channel` with an optional payload.
    pub async fn notify(&mut self, channel: &str, payload: &str) -> crate::Result<()> {
        if payload.is_empty() {
            self.simple_query(&format!("NOTIFY {}", quote_identifier(channel))).await?;
        } else {
            // `pg_notify` takes its payload as a regular string argument, sidestepping the need
            // to escape it as a SQL string literal ourselves.
            self.simple_query(&format!(
                "SELECT pg_notify({}, {})",
                quote_literal(channel),
                quote_literal(payload)
            ))
            .await?;
        }
        Ok(())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
