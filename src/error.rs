//! Error and Result types.

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::io;

/// A specialized `Result` type for pgcore.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A generic error that represents all the ways a method in this crate can fail.
#[derive(Debug)]
pub enum Error {
    /// Error communicating with the socket.
    Io(io::Error),

    /// Connection URL or passfile was malformed.
    Config(String),

    /// Connection URL was malformed.
    UrlParse(url::ParseError),

    /// The server closed the connection, or a TLS upgrade failed.
    Connection(String),

    /// The server rejected our credentials, or we don't support its auth method.
    Authentication(String),

    /// An `ErrorResponse` was returned by the database.
    Database(Box<PgDatabaseError>),

    /// Unexpected or invalid data was encountered. This would indicate that we received data
    /// that we were not expecting or it was in a format we did not understand. This generally
    /// means either there is a programming error in this driver, or something with the
    /// connection or the database itself is corrupted.
    Protocol(String),

    /// Misuse of the API by the caller: a concurrent operation on one connection, an unsupported
    /// parameter type, a cursor used outside of a transaction, etc. This never reaches the wire.
    Interface(String),

    /// A value failed to encode or decode.
    Data(String),

    /// No rows were returned by a query that expected to return at least one row.
    RowNotFound,

    /// Column was not found by name in a row.
    ColumnNotFound(Box<str>),

    /// Column index was out of bounds.
    ColumnIndexOutOfBounds { index: usize, len: usize },

    /// A [`Pool::acquire`](crate::pool::Pool::acquire) timed out.
    PoolTimedOut,

    /// [`Pool::close`](crate::pool::Pool::close) was called while we were waiting in acquire.
    PoolClosed,

    /// A command or acquire deadline elapsed.
    Timeout,
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            Error::UrlParse(error) => Some(error),
            Error::Database(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "{error}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::UrlParse(error) => write!(f, "{error}"),
            Error::Connection(msg) => write!(f, "connection error: {msg}"),
            Error::Authentication(msg) => write!(f, "authentication failed: {msg}"),
            Error::Database(error) => Display::fmt(error, f),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Interface(msg) => write!(f, "usage error: {msg}"),
            Error::Data(msg) => write!(f, "{msg}"),
            Error::RowNotFound => f.write_str("found no rows when we expected at least one"),
            Error::ColumnNotFound(name) => write!(f, "no column found with the name {name:?}"),
            Error::ColumnIndexOutOfBounds { index, len } => write!(
                f,
                "column index out of bounds: there are {len} columns but the index is {index}"
            ),
            Error::PoolTimedOut => f.write_str("timed out while waiting for an open connection"),
            Error::PoolClosed => f.write_str("attempted to acquire a connection on a closed pool"),
            Error::Timeout => f.write_str("operation timed out"),
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<url::ParseError> for Error {
    #[inline]
    fn from(err: url::ParseError) -> Self {
        Error::UrlParse(err)
    }
}

impl From<PgDatabaseError> for Error {
    #[inline]
    fn from(err: PgDatabaseError) -> Self {
        Error::Database(Box::new(err))
    }
}

/// Used by the `err_protocol!()` macro for a lazily evaluated conversion to
/// `crate::Error::Protocol`, so it can be used with `.ok_or_else()` without clippy complaining.
macro_rules! err_protocol {
    ($($args:tt)*) => {
        $crate::error::Error::Protocol(format!($($args)*))
    };
}

pub(crate) use err_protocol;

/// A structured `ErrorResponse`/`NoticeResponse` as returned by the server.
///
/// Field layout follows the protocol's error/notice field table:
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
#[derive(Debug, Clone, Default)]
pub struct PgDatabaseError {
    pub(crate) severity: String,
    pub(crate) code: String,
    pub(crate) message: String,
    pub(crate) detail: Option<String>,
    pub(crate) hint: Option<String>,
    pub(crate) position: Option<u32>,
    pub(crate) internal_position: Option<u32>,
    pub(crate) internal_query: Option<String>,
    pub(crate) where_: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) column: Option<String>,
    pub(crate) data_type: Option<String>,
    pub(crate) constraint: Option<String>,
    pub(crate) file: Option<String>,
    pub(crate) line: Option<u32>,
    pub(crate) routine: Option<String>,
}

impl PgDatabaseError {
    /// The SQLSTATE code for the error.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// The class of the SQLSTATE (its first two characters).
    pub fn class(&self) -> &str {
        self.code.get(..2).unwrap_or("")
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code == "23505"
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.code == "23503"
    }

    pub fn is_serialization_failure(&self) -> bool {
        self.code == "40001"
    }

    pub fn is_deadlock_detected(&self) -> bool {
        self.code == "40P01"
    }

    /// `true` if this is the error the server returns for a canceled query (SQLSTATE `57014`).
    pub fn is_query_canceled(&self) -> bool {
        self.code == "57014"
    }

    pub fn is_connection_exception(&self) -> bool {
        self.class() == "08"
    }
}

impl Display for PgDatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.severity, self.code, self.message)
    }
}

impl StdError for PgDatabaseError {}
