use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::Error;
use crate::net::Socket;
use crate::options::{PgConnectOptions, PgSslMode};

#[cfg(feature = "tls-rustls")]
use std::convert::TryFrom;
#[cfg(feature = "tls-rustls")]
use std::sync::Arc;
#[cfg(feature = "tls-rustls")]
use tokio_rustls::{client::TlsStream, rustls, TlsConnector};

/// A socket that may or may not have been upgraded to TLS.
pub(crate) enum MaybeTlsStream {
    Raw(Socket),
    #[cfg(feature = "tls-rustls")]
    Rustls(Box<TlsStream<Socket>>),
    #[cfg(feature = "tls-native")]
    Native(Box<async_native_tls::TlsStream<Socket>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::Native(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::Native(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::Native(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::Native(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// The fixed 8-byte `SSLRequest` packet (no tag byte, special-cased per §6): a length of 8
/// followed by the magic code `80877103`.
const SSL_REQUEST: [u8; 8] = [0, 0, 0, 8, 0x04, 0xd2, 0x16, 0x2f];

/// Negotiate a TLS upgrade if `options.ssl_mode` requires or allows it. Sends the special
/// `SSLRequest` packet before any `StartupMessage` bytes reach the wire, per §6.
pub(crate) async fn maybe_upgrade(
    socket: Socket,
    options: &PgConnectOptions,
    host: &str,
) -> crate::Result<MaybeTlsStream> {
    if matches!(options.ssl_mode, PgSslMode::Disable) {
        return Ok(MaybeTlsStream::Raw(socket));
    }

    let mut socket = socket;
    write_all(&mut socket, &SSL_REQUEST).await?;

    let mut response = [0u8; 1];
    read_exact(&mut socket, &mut response).await?;

    match response[0] {
        b'S' => upgrade_via_enabled_backend(socket, options, host).await,
        b'N' => {
            if options.ssl_mode.requires_tls() {
                Err(Error::Connection(
                    "server does not support TLS, but sslmode requires it".into(),
                ))
            } else {
                Ok(MaybeTlsStream::Raw(socket))
            }
        }
        other => Err(crate::error::err_protocol!(
            "unexpected response to SSLRequest: {other:#x}"
        )),
    }
}

/// Dispatches to whichever TLS backend feature is enabled. `tls-rustls` takes priority if both
/// are compiled in, matching `default = ["tls-rustls"]`.
async fn upgrade_via_enabled_backend(
    #[cfg_attr(not(any(feature = "tls-rustls", feature = "tls-native")), allow(unused_variables))]
    socket: Socket,
    #[cfg_attr(not(any(feature = "tls-rustls", feature = "tls-native")), allow(unused_variables))]
    options: &PgConnectOptions,
    #[cfg_attr(not(any(feature = "tls-rustls", feature = "tls-native")), allow(unused_variables))]
    host: &str,
) -> crate::Result<MaybeTlsStream> {
    #[cfg(feature = "tls-rustls")]
    {
        upgrade_rustls(socket, options, host).await
    }

    #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
    {
        upgrade_native_tls(socket, options, host).await
    }

    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
    {
        Err(Error::Config(
            "server requested a TLS upgrade but this build has no TLS backend enabled".into(),
        ))
    }
}

#[cfg(feature = "tls-rustls")]
async fn upgrade_rustls(
    socket: Socket,
    options: &PgConnectOptions,
    host: &str,
) -> crate::Result<MaybeTlsStream> {
    let verify_hostname = matches!(options.ssl_mode, PgSslMode::VerifyFull);

    let mut root_store = rustls::RootCertStore::empty();
    if let Some(ref path) = options.ssl_root_cert {
        let mut reader = io::BufReader::new(std::fs::File::open(path)?);
        for cert in rustls_pemfile::certs(&mut reader)? {
            root_store
                .add(&rustls::Certificate(cert))
                .map_err(|e| Error::Connection(format!("invalid root certificate: {e}")))?;
        }
    } else {
        root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
            rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
    }

    let mut config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    if !verify_hostname {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(danger::NoHostnameVerification));
    }

    let connector = TlsConnector::from(Arc::new(config));
    let server_name = rustls::ServerName::try_from(host)
        .map_err(|_| Error::Connection(format!("invalid DNS name for TLS: {host}")))?;

    let stream = connector
        .connect(server_name, socket)
        .await
        .map_err(|e| Error::Connection(format!("TLS handshake failed: {e}")))?;

    Ok(MaybeTlsStream::Rustls(Box::new(stream)))
}

/// The `async-native-tls` backend (OpenSSL/Secure Transport/SChannel via the `native-tls` crate):
/// `danger_accept_invalid_certs`/`danger_accept_invalid_hostnames` plus an optional root CA file.
#[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
async fn upgrade_native_tls(
    socket: Socket,
    options: &PgConnectOptions,
    host: &str,
) -> crate::Result<MaybeTlsStream> {
    let accept_invalid_certs = !matches!(options.ssl_mode, PgSslMode::VerifyCa | PgSslMode::VerifyFull);
    let accept_invalid_hostnames = !matches!(options.ssl_mode, PgSslMode::VerifyFull);

    let mut builder = async_native_tls::TlsConnector::new()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_hostnames);

    if let Some(ref path) = options.ssl_root_cert {
        let pem = std::fs::read(path)?;
        let cert = async_native_tls::Certificate::from_pem(&pem)
            .map_err(|e| Error::Connection(format!("invalid root certificate: {e}")))?;
        builder = builder.add_root_certificate(cert);
    }

    let stream = builder
        .connect(host, socket)
        .await
        .map_err(|e| Error::Connection(format!("TLS handshake failed: {e}")))?;

    Ok(MaybeTlsStream::Native(Box::new(stream)))
}

#[cfg(feature = "tls-rustls")]
mod danger {
    use tokio_rustls::rustls;

    /// Used for `sslmode=require`/`verify-ca` where the certificate chain is still validated
    /// against the root store but the hostname is not checked against the certificate's SANs.
    pub(super) struct NoHostnameVerification;

    impl rustls::client::ServerCertVerifier for NoHostnameVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &rustls::Certificate,
            _intermediates: &[rustls::Certificate],
            _server_name: &rustls::ServerName,
            _scts: &mut dyn Iterator<Item = &[u8]>,
            _ocsp_response: &[u8],
            _now: std::time::SystemTime,
        ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
            Ok(rustls::client::ServerCertVerified::assertion())
        }
    }
}

async fn write_all(socket: &mut Socket, buf: &[u8]) -> crate::Result<()> {
    use tokio::io::AsyncWriteExt;
    socket.write_all(buf).await?;
    socket.flush().await?;
    Ok(())
}

async fn read_exact(socket: &mut Socket, buf: &mut [u8]) -> crate::Result<()> {
    use tokio::io::AsyncReadExt;
    socket.read_exact(buf).await?;
    Ok(())
}
