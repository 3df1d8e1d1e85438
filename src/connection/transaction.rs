//! Transaction and savepoint nesting (§4.6), built on `BEGIN`/`SAVEPOINT`/`RELEASE
//! SAVEPOINT`/`ROLLBACK [TO SAVEPOINT]` over the simple query protocol, plus the scoped
//! [`PgConnection::transaction`] convenience built on top of them.
//!
//! Plain inherent methods rather than a `TransactionManager` trait — there's only one backend
//! here, so the genericity a trait buys elsewhere has no payoff. The scoped helper is
//! closure-taking rather than an RAII guard, which sidesteps needing an async `Drop` to roll
//! back an abandoned transaction.

use futures_core::future::BoxFuture;

use crate::connection::PgConnection;
use crate::error::Error;

fn savepoint_name(depth: u32) -> String {
    format!("_pgcore_savepoint_{depth}")
}

/// `SET TRANSACTION`-level settings for the outermost `BEGIN` of a [`PgConnection::transaction`]
/// scope (§4.6). Ignored for a nested scope, since Postgres only accepts these on the
/// transaction's first `BEGIN` — a savepoint inherits whatever the enclosing transaction is
/// already running under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub deferrable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl TransactionOptions {
    fn as_begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");

        if let Some(isolation) = self.isolation {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(isolation.as_sql());
        }

        sql.push_str(if self.read_only { " READ ONLY" } else { " READ WRITE" });
        sql.push_str(if self.deferrable { " DEFERRABLE" } else { " NOT DEFERRABLE" });

        sql
    }
}

impl PgConnection {
    /// Begins a transaction, or — if already inside one — a nested savepoint. Matches `BEGIN`
    /// with `COMMIT`/`ROLLBACK`, or `SAVEPOINT` with `RELEASE SAVEPOINT`/`ROLLBACK TO SAVEPOINT`.
    pub async fn begin(&mut self) -> crate::Result<()> {
        self.begin_with(TransactionOptions::default()).await
    }

    pub(crate) async fn begin_with(&mut self, options: TransactionOptions) -> crate::Result<()> {
        let sql = if self.transaction_depth == 0 {
            options.as_begin_sql()
        } else {
            format!("SAVEPOINT {}", savepoint_name(self.transaction_depth))
        };

        self.simple_query(&sql).await?;
        self.transaction_depth += 1;
        Ok(())
    }

    /// Runs `body` inside a transaction scope (a nested [`PgConnection::transaction`] call opens
    /// a savepoint instead): `options` govern the outermost `BEGIN` only. Commits on success,
    /// rolls back if `body` returns an error, and propagates whichever error occurs first if both
    /// the body and the rollback fail.
    pub async fn transaction<F, T>(&mut self, options: TransactionOptions, body: F) -> crate::Result<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, crate::Result<T>>,
    {
        self.begin_with(options).await?;

        match body(self).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(error) => {
                self.rollback().await?;
                Err(error)
            }
        }
    }

    /// Commits the innermost open transaction or savepoint.
    pub async fn commit(&mut self) -> crate::Result<()> {
        if self.transaction_depth == 0 {
            return Err(Error::Interface("commit() called with no open transaction".into()));
        }

        let sql = if self.transaction_depth == 1 {
            "COMMIT".to_owned()
        } else {
            format!("RELEASE SAVEPOINT {}", savepoint_name(self.transaction_depth - 1))
        };

        self.simple_query(&sql).await?;
        self.transaction_depth -= 1;
        Ok(())
    }

    /// Rolls back the innermost open transaction or savepoint.
    pub async fn rollback(&mut self) -> crate::Result<()> {
        if self.transaction_depth == 0 {
            return Err(Error::Interface("rollback() called with no open transaction".into()));
        }

        let sql = if self.transaction_depth == 1 {
            "ROLLBACK".to_owned()
        } else {
            format!("ROLLBACK TO SAVEPOINT {}", savepoint_name(self.transaction_depth - 1))
        };

        self.simple_query(&sql).await?;
        self.transaction_depth -= 1;
        Ok(())
    }
}
