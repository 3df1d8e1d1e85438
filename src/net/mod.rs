//! Transport: plain TCP/Unix sockets, optionally upgraded to TLS.

mod socket;
mod tls;

pub(crate) use socket::Socket;
pub(crate) use tls::{maybe_upgrade, MaybeTlsStream};
