//! The connect/authenticate handshake (§4.4/§4.9).
//!
//! No multi-host fallback loop here — [`PgConnectOptions`] names exactly one host (see
//! `DESIGN.md` for why). Unknown parameter types are resolved by the introspection path (C8)
//! once the connection exists, not during `Startup`.

use std::sync::Arc;

use crate::connection::auth;
use crate::connection::stream::PgStream;
use crate::connection::PgConnection;
use crate::error::{err_protocol, Error};
use crate::message::{Authentication, Backend, Password, Startup, TransactionStatus};
use crate::options::{PgConnectOptions, TargetSessionAttrs};
use crate::statement_cache::StatementCache;
use crate::types::registry::TypeRegistry;

impl PgConnection {
    pub(crate) async fn establish(options: &PgConnectOptions) -> crate::Result<Self> {
        let mut stream = PgStream::connect(options, &options.host, options.port).await?;

        let mut params: Vec<(&str, &str)> = vec![("DateStyle", "ISO"), ("client_encoding", "UTF8"), ("TimeZone", "UTC")];

        if let Some(extra_float_digits) = &options.extra_float_digits {
            params.push(("extra_float_digits", extra_float_digits));
        }
        if let Some(application_name) = &options.application_name {
            params.push(("application_name", application_name));
        }
        if let Some(replication_options) = &options.options {
            params.push(("options", replication_options));
        }

        stream.write_raw(&Startup {
            username: Some(&options.username),
            database: options.database.as_deref(),
            params: &params,
        }
        .to_frame());
        stream.flush().await?;

        let (process_id, secret_key, transaction_status) = authenticate(&mut stream, options).await?;

        let mut conn = PgConnection {
            stream,
            connect_options: Arc::new(options.clone()),
            process_id,
            secret_key,
            transaction_status,
            transaction_depth: 0,
            pending_ready_for_query_count: 0,
            statements: StatementCache::new(options.statement_cache_capacity),
            in_flight_statement: None,
            pending_closes: Vec::new(),
            types: TypeRegistry::new(),
        };

        check_target_session_attrs(&mut conn, options).await?;

        Ok(conn)
    }
}

/// Drives authentication to completion and returns the `BackendKeyData` plus the transaction
/// status carried on the opening `ReadyForQuery`.
async fn authenticate(
    stream: &mut PgStream,
    options: &PgConnectOptions,
) -> crate::Result<(u32, u32, TransactionStatus)> {
    let mut process_id = 0;
    let mut secret_key = 0;

    loop {
        match stream.recv().await? {
            Backend::Authentication(Authentication::Ok) => {}

            Backend::Authentication(Authentication::CleartextPassword) => {
                let password = password_or_err(options)?;
                stream.send(Password::Cleartext(&password)).await?;
            }

            Backend::Authentication(Authentication::Md5Password { salt }) => {
                let password = password_or_err(options)?;
                stream
                    .send(Password::Md5 {
                        username: &options.username,
                        password: &password,
                        salt,
                    })
                    .await?;
            }

            Backend::Authentication(Authentication::Sasl { mechanisms }) => {
                let password = password_or_err(options)?;
                auth::authenticate_sasl(stream, &password, &mechanisms).await?;
            }

            Backend::Authentication(other) => {
                return Err(Error::Authentication(format!(
                    "unsupported authentication method offered by server: {other:?}"
                )));
            }

            Backend::BackendKeyData(key_data) => {
                process_id = key_data.process_id;
                secret_key = key_data.secret_key;
            }

            Backend::ReadyForQuery(ready) => return Ok((process_id, secret_key, ready.status)),

            other => return Err(err_protocol!("unexpected message during startup: {other:?}")),
        }
    }
}

fn password_or_err(options: &PgConnectOptions) -> crate::Result<String> {
    options.resolve_password().ok_or_else(|| {
        Error::Authentication("server requested a password but none was configured or found in .pgpass".into())
    })
}

/// Confirms the freshly established connection matches `target_session_attrs` (§4.9), using
/// `SHOW transaction_read_only`, the same check libpq's `is_primary` makes.
async fn check_target_session_attrs(conn: &mut PgConnection, options: &PgConnectOptions) -> crate::Result<()> {
    use TargetSessionAttrs::*;

    let wants_primary = matches!(options.target_session_attrs, ReadWrite | Primary);
    let wants_standby = matches!(options.target_session_attrs, ReadOnly | Standby);

    if !wants_primary && !wants_standby {
        return Ok(());
    }

    let rows = conn.simple_query("SHOW transaction_read_only").await?;
    let read_only = rows
        .into_iter()
        .find_map(|row| row.right())
        .and_then(|row| row.try_get(0).ok().and_then(|v| v.as_str().map(str::to_owned)))
        .map(|v| v == "on")
        .unwrap_or(false);

    if wants_primary && read_only {
        return Err(Error::Connection(
            "target_session_attrs requires a read-write connection, but the server reports transaction_read_only=on".into(),
        ));
    }

    if wants_standby && !read_only {
        return Err(Error::Connection(
            "target_session_attrs requires a read-only standby, but the server reports transaction_read_only=off".into(),
        ));
    }

    Ok(())
}
