//! Executes statements over the extended-query sub-protocol (§4.4), preparing and caching
//! statements as needed, and the simple-query path used internally and for unprepared,
//! multi-statement SQL.
//!
//! `run()` is built around `async_stream::try_stream!`, driving `Parse`/`Describe`/`Sync` (rather
//! than `Parse`/`Describe`/`Flush`) so statement preparation is its own self-contained
//! extended-query unit instead of being folded into the following `Bind`/`Execute`.

use std::sync::Arc;

use async_stream::try_stream;
use either::Either;
use futures_core::stream::BoxStream;

use crate::connection::stream::PgStream;
use crate::connection::{PgConnection, PreparedStatement};
use crate::error::{err_protocol, Error};
use crate::message::{
    Backend, Bind, Close, CloseTarget, Describe, DescribeTarget, Execute, Parse, Query,
};
use crate::row::{Column, PgRow};
use crate::types::oid;
use crate::types::registry::{FORMAT_BINARY, FORMAT_TEXT};
use crate::types::{Oid, PgHasType, PgValue};

impl PgConnection {
    /// Looks up `sql` in the statement cache, or prepares it fresh: `Parse` + `Describe` +
    /// `Sync`, one self-contained extended-query unit (§4.4). Any statement evicted to make room
    /// is closed immediately, unless it is the one currently bound to the in-flight portal, in
    /// which case its `Close` is deferred (§4.5).
    pub(crate) async fn prepare(&mut self, sql: &str, param_oids: &[Oid]) -> crate::Result<Arc<PreparedStatement>> {
        if let Some(statement) = self.statements.get(sql) {
            return Ok(Arc::clone(statement));
        }

        let name = self.statements.next_name();
        let raw_param_oids: Vec<u32> = param_oids.iter().map(|o| o.as_u32()).collect();

        self.stream.write(Parse {
            statement: &name,
            query: sql,
            param_types: &raw_param_oids,
        });
        self.stream.write(Describe(DescribeTarget::Statement(&name)));
        self.stream.write(crate::message::Sync);
        self.pending_ready_for_query_count += 1;
        self.stream.flush().await?;

        match self.stream.recv().await? {
            Backend::ParseComplete => {}
            other => return Err(err_protocol!("expected ParseComplete, got {other:?}")),
        }

        let params = match self.stream.recv().await? {
            Backend::ParameterDescription(params) => params,
            other => return Err(err_protocol!("expected ParameterDescription, got {other:?}")),
        };

        let columns = match self.stream.recv().await? {
            Backend::RowDescription(row_description) => columns_from(row_description),
            Backend::NoData => Vec::new(),
            other => return Err(err_protocol!("expected RowDescription or NoData, got {other:?}")),
        };

        match self.stream.recv().await? {
            Backend::ReadyForQuery(ready) => self.handle_ready_for_query(ready)?,
            other => return Err(err_protocol!("expected ReadyForQuery, got {other:?}")),
        }

        let statement = Arc::new(PreparedStatement {
            name,
            param_types: params.types.into_iter().map(Oid::new).collect(),
            columns: columns.into(),
        });

        if let Some(evicted) =
            self.statements.insert(sql.to_owned(), Arc::clone(&statement), self.in_flight_statement.as_deref())
        {
            if evicted.blocked {
                self.pending_closes.push(evicted.value.name.clone());
            } else {
                close_statement(&mut self.stream, &mut self.pending_ready_for_query_count, &evicted.value.name)
                    .await?;
            }
        }

        Ok(statement)
    }

    /// The simple-query path (§4.3/§4.4): no parameters, always text format, and the only path
    /// that allows multiple statements or multiple result sets in one round trip. Self-barriered
    /// — a bare `Query` always ends in exactly one `ReadyForQuery`.
    pub(crate) async fn simple_query(&mut self, sql: &str) -> crate::Result<Vec<Either<u64, PgRow>>> {
        self.wait_until_ready().await?;

        self.stream.write(Query(sql));
        self.pending_ready_for_query_count += 1;
        self.stream.flush().await?;

        let mut out = Vec::new();
        let mut columns: Arc<[Column]> = Arc::from(Vec::new());

        loop {
            match self.stream.recv().await? {
                Backend::RowDescription(row_description) => {
                    columns = Arc::from(columns_from(row_description));
                }
                Backend::DataRow(data) => {
                    out.push(Either::Right(decode_row(&self.types, &data, Arc::clone(&columns), FORMAT_TEXT)?));
                }
                Backend::CommandComplete(cc) => out.push(Either::Left(cc.affected_rows)),
                Backend::EmptyQueryResponse => {}
                Backend::ReadyForQuery(ready) => {
                    self.handle_ready_for_query(ready)?;
                    break;
                }
                other => return Err(err_protocol!("unexpected message in simple query: {other:?}")),
            }
        }

        Ok(out)
    }

    /// The extended-query path (§4.4): prepares (or reuses) the statement, binds `params`, and
    /// streams the result. `chunk_size` of `0` runs `Execute` with no row limit; a positive value
    /// pages the portal via repeated `Execute`+`Sync` rounds until `PortalSuspended` stops
    /// appearing (§4.6's cursor support).
    pub(crate) fn run<'c>(
        &'c mut self,
        sql: &'c str,
        params: &'c [PgValue],
        chunk_size: i32,
    ) -> BoxStream<'c, crate::Result<Either<u64, PgRow>>> {
        Box::pin(try_stream! {
            self.wait_until_ready().await?;

            let param_oids: Vec<Oid> = params.iter().map(oid_for_param).collect::<crate::Result<_>>()?;
            let statement = self.prepare(sql, &param_oids).await?;
            self.in_flight_statement = Some(statement.name.clone());

            // Resolve any OID among the parameters or result columns this connection hasn't
            // seen before (a user-defined enum, composite, domain, or range) before computing
            // result formats, which need to know an enum from an ordinary binary-codec type (§4.8).
            let mut unresolved: Vec<Oid> = param_oids
                .iter()
                .copied()
                .chain(statement.columns.iter().map(|c| c.type_oid))
                .filter(|oid| !self.types.is_known(*oid))
                .collect();
            unresolved.sort_by_key(Oid::as_u32);
            unresolved.dedup();
            if !unresolved.is_empty() {
                self.resolve_types(&unresolved).await?;
            }

            let result_formats: Vec<i16> = statement
                .columns
                .iter()
                .map(|c| self.types.preferred_format(c.type_oid))
                .collect();

            let bound: Vec<Option<Vec<u8>>> = params
                .iter()
                .zip(param_oids.iter())
                .map(|(value, oid)| self.types.encode_param(value, *oid))
                .collect::<crate::Result<_>>()?;

            self.stream.write(Bind {
                portal: "",
                statement: &statement.name,
                param_formats: &[FORMAT_BINARY],
                params: &bound,
                result_formats: &result_formats,
            });

            let columns = Arc::clone(&statement.columns);
            let mut finished = false;

            while !finished {
                self.stream.write(Execute { portal: "", max_rows: chunk_size });
                self.stream.write(crate::message::Sync);
                self.pending_ready_for_query_count += 1;
                self.stream.flush().await?;

                loop {
                    match self.stream.recv().await? {
                        Backend::BindComplete => {}
                        Backend::DataRow(data) => {
                            yield Either::Right(decode_row(&self.types, &data, Arc::clone(&columns), FORMAT_BINARY)?);
                        }
                        Backend::CommandComplete(cc) => {
                            yield Either::Left(cc.affected_rows);
                            finished = true;
                        }
                        // More rows remain past `chunk_size`; this round still ends in its own
                        // `ReadyForQuery` (we sent one `Sync`), so just note we're not done yet.
                        Backend::PortalSuspended => {}
                        Backend::ReadyForQuery(ready) => {
                            self.handle_ready_for_query(ready)?;
                            break;
                        }
                        other => Err(err_protocol!("unexpected message during execute: {other:?}"))?,
                    }
                }
            }

            self.in_flight_statement = None;
            self.flush_pending_closes().await?;
        })
    }

    /// Runs `sql` with `params` bound and returns the number of rows affected, discarding any
    /// returned rows.
    pub async fn execute(&mut self, sql: &str, params: &[PgValue]) -> crate::Result<u64> {
        use futures_util::TryStreamExt;

        let mut affected = 0;
        let mut stream = self.run(sql, params, 0);
        while let Some(item) = stream.try_next().await? {
            if let Either::Left(rows) = item {
                affected += rows;
            }
        }
        Ok(affected)
    }

    /// Runs `sql` with `params` bound and collects every returned row.
    pub async fn fetch(&mut self, sql: &str, params: &[PgValue]) -> crate::Result<Vec<PgRow>> {
        use futures_util::TryStreamExt;

        let rows: Vec<PgRow> = self
            .run(sql, params, 0)
            .try_filter_map(|item| async move { Ok(item.right()) })
            .try_collect()
            .await?;

        Ok(rows)
    }

    /// Runs `sql` with `params` bound and returns the first row, or [`Error::RowNotFound`] if the
    /// statement produced none.
    pub async fn fetch_row(&mut self, sql: &str, params: &[PgValue]) -> crate::Result<PgRow> {
        self.fetch(sql, params).await?.into_iter().next().ok_or(Error::RowNotFound)
    }

    /// Runs `sql` with `params` bound and returns the first column of the first row.
    pub async fn fetch_val(&mut self, sql: &str, params: &[PgValue]) -> crate::Result<PgValue> {
        let row = self.fetch_row(sql, params).await?;
        Ok(row.try_get(0)?.clone())
    }

    /// Runs `sql` with `params` bound, streaming results in pages of `row_limit` rows via
    /// repeated `Execute`/`PortalSuspended` rounds instead of fetching the whole result set
    /// up front (§4.6).
    pub fn cursor<'c>(
        &'c mut self,
        sql: &'c str,
        params: &'c [PgValue],
        row_limit: i32,
    ) -> BoxStream<'c, crate::Result<PgRow>> {
        use futures_util::StreamExt;

        Box::pin(self.run(sql, params, row_limit).filter_map(|item| async move {
            match item {
                Ok(Either::Right(row)) => Some(Ok(row)),
                Ok(Either::Left(_)) => None,
                Err(e) => Some(Err(e)),
            }
        }))
    }
}

fn columns_from(row_description: crate::message::RowDescription) -> Vec<Column> {
    row_description
        .fields
        .into_iter()
        .map(|f| Column { name: f.name, type_oid: Oid::new(f.type_id) })
        .collect()
}

fn decode_row(
    types: &crate::types::registry::TypeRegistry,
    data: &crate::message::DataRow,
    columns: Arc<[Column]>,
    format: i16,
) -> crate::Result<PgRow> {
    let values = (0..data.len())
        .map(|i| types.decode_column(columns[i].type_oid, format, data.get(i)))
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(PgRow { columns, values })
}

async fn close_statement(
    stream: &mut PgStream,
    pending_ready_for_query_count: &mut usize,
    name: &str,
) -> crate::Result<()> {
    stream.write(Close(CloseTarget::Statement(name)));
    stream.write(crate::message::Sync);
    *pending_ready_for_query_count += 1;
    stream.flush().await?;

    match stream.recv().await? {
        Backend::ReadyForQuery(_) => {
            *pending_ready_for_query_count -= 1;
            Ok(())
        }
        other => Err(err_protocol!("expected ReadyForQuery after Close, got {other:?}")),
    }
}

/// Picks the OID used to both declare (`Parse`) and binary-encode (`Bind`) a query parameter,
/// from the shape of the value itself. There is no SQL-level type annotation to consult here —
/// callers needing an explicit cast should add one in the query text (`$1::uuid`) and accept the
/// server's inferred type instead by binding through [`crate::connection::PgConnection::prepare`]
/// directly with an empty OID list, which this helper does not need to special-case.
fn oid_for_param(value: &PgValue) -> crate::Result<Oid> {
    Ok(match value {
        // `NULL` carries no type information of its own; declaring it `text` lets Postgres apply
        // its usual implicit-cast rules rather than rejecting the statement outright.
        PgValue::Null => oid::TEXT,
        PgValue::Bool(_) => bool::type_oid(),
        PgValue::Int2(_) => i16::type_oid(),
        PgValue::Int4(_) => i32::type_oid(),
        PgValue::Int8(_) => i64::type_oid(),
        PgValue::Float4(_) => f32::type_oid(),
        PgValue::Float8(_) => f64::type_oid(),
        PgValue::Text(_) => String::type_oid(),
        PgValue::Bytes(_) => Vec::<u8>::type_oid(),
        PgValue::Numeric(_) => oid::NUMERIC,
        PgValue::Uuid(_) => oid::UUID,
        PgValue::Json(_) => oid::JSONB,
        PgValue::Date(_) => oid::DATE,
        PgValue::Time(_) => oid::TIME,
        PgValue::Timestamp(_) => oid::TIMESTAMP,
        PgValue::Timestamptz(_) => oid::TIMESTAMPTZ,
        PgValue::Interval(_) => oid::INTERVAL,
        PgValue::Inet(_) => oid::INET,
        PgValue::MacAddr(_) => oid::MACADDR,
        PgValue::Point(_) => oid::POINT,
        PgValue::Money(_) => oid::MONEY,
        PgValue::Bit(_) => oid::VARBIT,
        PgValue::Array(items) => {
            let element_oid = items
                .iter()
                .find(|v| !v.is_null())
                .map(oid_for_param)
                .transpose()?
                .unwrap_or(oid::TEXT);

            oid::array_oid(element_oid).ok_or_else(|| {
                Error::Interface(format!(
                    "binding an array of type oid {} has no known array oid; pass it through set_type_codec instead",
                    element_oid.as_u32()
                ))
            })?
        }
        PgValue::Range(_) | PgValue::Composite(_) => {
            return Err(Error::Interface(
                "binding a range or composite parameter requires an explicit type oid, which this \
                 connection has no way to infer from the value alone; cast it in the query text instead"
                    .into(),
            ))
        }
    })
}
