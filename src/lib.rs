#![forbid(unsafe_code)]

//! `pgcore`: a PostgreSQL frontend/backend wire protocol engine, independent of any particular
//! async runtime's connection-pool or query-builder conventions. It speaks the protocol directly
//! — `Startup`, the extended-query `Parse`/`Bind`/`Describe`/`Execute`/`Sync` sub-protocol, the
//! simple-query protocol, `COPY`, `LISTEN`/`NOTIFY`, and cancellation — over a runtime type
//! registry that resolves user-defined enums, composites, domains, and ranges on demand.
//!
//! ```no_run
//! # async fn run() -> pgcore::Result<()> {
//! use pgcore::PgConnection;
//!
//! let mut conn = PgConnection::connect_with("postgres://localhost/test").await?;
//! let row = conn.fetch_row("SELECT $1::int4 + 1", &[1.into()]).await?;
//! assert_eq!(row.try_get(0)?.as_i64(), Some(2));
//! # Ok(())
//! # }
//! ```

pub mod error;

mod io;

mod connection;
mod message;
mod net;
mod options;
mod pgpass;
pub mod pool;
mod row;
mod scram;
mod statement_cache;
pub mod types;

pub use connection::{IsolationLevel, PgCancelToken, PgConnection, PgCopyIn, TransactionOptions};
pub use error::{Error, Result};
pub use options::{PgConnectOptions, PgSslMode, TargetSessionAttrs};
pub use pool::{Pool, PoolConnection, PoolOptions};
pub use row::PgRow;
pub use types::{
    CustomCodec, Oid, PgHasType, PgInterval, PgNumeric, PgNumericSign, PgPoint, PgRange, PgRangeBound, PgRecord,
    PgTypeInfo, PgTypeKind, PgValue,
};
