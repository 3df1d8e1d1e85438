//! Runtime OID introspection (C8): resolves a type OID we don't already know — a user-defined
//! composite, enum, range, or domain — by querying `pg_catalog.pg_type` (and `pg_attribute`,
//! `pg_enum`, `pg_range` as needed) over the same connection, via the simple query protocol so it
//! never occupies a slot in the user statement cache (§4.8).
//!
//! Classifies by `pg_type.typtype` (the direct column for "is this a domain/composite/enum/
//! range") and walks the dependency graph breadth-first with a `seen` set rather than recursing,
//! which sidesteps cycles for free: a self- or mutually-referential composite just never gets
//! queued twice.

use std::collections::{HashSet, VecDeque};

use crate::connection::PgConnection;
use crate::error::err_protocol;
use crate::types::{Oid, PgTypeInfo, PgTypeKind, PgValue};

impl PgConnection {
    /// Resolves every OID in `oids` that this connection's type registry doesn't already know,
    /// along with anything they transitively reference (an array's element, a composite's
    /// fields, a domain's base type, a range's subtype). Idempotent and safe to call with OIDs
    /// already known; those are skipped.
    pub(crate) async fn resolve_types(&mut self, oids: &[Oid]) -> crate::Result<()> {
        let mut seen: HashSet<Oid> = HashSet::new();
        let mut queue: VecDeque<Oid> = VecDeque::new();

        for &oid in oids {
            if oid.as_u32() != 0 && !self.types.is_known(oid) && seen.insert(oid) {
                queue.push_back(oid);
            }
        }

        while let Some(oid) = queue.pop_front() {
            self.resolve_one(oid, &mut queue, &mut seen).await?;
        }

        Ok(())
    }

    async fn resolve_one(&mut self, oid: Oid, queue: &mut VecDeque<Oid>, seen: &mut HashSet<Oid>) -> crate::Result<()> {
        let row = self
            .introspection_row(&format!(
                "SELECT typname, typtype, typrelid, typelem, typbasetype \
                 FROM pg_catalog.pg_type WHERE oid = {}",
                oid.as_u32()
            ))
            .await?
            .ok_or_else(|| err_protocol!("no pg_type entry for type oid {}", oid.as_u32()))?;

        let name = row[0].as_str().unwrap_or_default().to_owned();
        let typtype = row[1].as_str().and_then(|s| s.chars().next()).unwrap_or('b');
        let typrelid = parse_oid(&row[2]);
        let typelem = parse_oid(&row[3]);
        let typbasetype = parse_oid(&row[4]);

        let kind = match typtype {
            // The "true" array variant of a type carries its element oid in `typelem`; Postgres
            // still reports it as `typtype = 'b'` (base) rather than giving arrays their own code.
            'b' if typelem.as_u32() != 0 => {
                enqueue(queue, seen, self, typelem);
                PgTypeKind::Array(typelem)
            }
            'd' => {
                enqueue(queue, seen, self, typbasetype);
                PgTypeKind::Domain(typbasetype)
            }
            'e' => PgTypeKind::Enum(self.fetch_enum_labels(oid).await?.into()),
            'r' | 'm' => {
                let subtype = self.fetch_range_subtype(oid).await?;
                enqueue(queue, seen, self, subtype);
                PgTypeKind::Range(subtype)
            }
            'c' => {
                let fields = self.fetch_composite_fields(typrelid).await?;
                for &(_, field_oid) in &fields {
                    enqueue(queue, seen, self, field_oid);
                }
                PgTypeKind::Composite(fields.into())
            }
            'p' => PgTypeKind::Pseudo,
            _ => PgTypeKind::Simple,
        };

        self.types.insert_introspected(PgTypeInfo::new(oid, name, kind));
        Ok(())
    }

    async fn fetch_enum_labels(&mut self, oid: Oid) -> crate::Result<Vec<String>> {
        let rows = self
            .introspection_rows(&format!(
                "SELECT enumlabel FROM pg_catalog.pg_enum \
                 WHERE enumtypid = {} ORDER BY enumsortorder",
                oid.as_u32()
            ))
            .await?;

        Ok(rows.into_iter().map(|row| row[0].as_str().unwrap_or_default().to_owned()).collect())
    }

    async fn fetch_range_subtype(&mut self, oid: Oid) -> crate::Result<Oid> {
        let row = self
            .introspection_row(&format!(
                "SELECT rngsubtype FROM pg_catalog.pg_range WHERE rngtypid = {}",
                oid.as_u32()
            ))
            .await?
            .ok_or_else(|| err_protocol!("no pg_range entry for range oid {}", oid.as_u32()))?;

        Ok(parse_oid(&row[0]))
    }

    async fn fetch_composite_fields(&mut self, relid: Oid) -> crate::Result<Vec<(String, Oid)>> {
        let rows = self
            .introspection_rows(&format!(
                "SELECT attname, atttypid FROM pg_catalog.pg_attribute \
                 WHERE attrelid = {} AND attnum > 0 AND NOT attisdropped ORDER BY attnum",
                relid.as_u32()
            ))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row[0].as_str().unwrap_or_default().to_owned(), parse_oid(&row[1])))
            .collect())
    }

    /// Runs an introspection query over the simple query protocol and collects its data rows.
    /// Never touches `self.statements` (§4.8).
    async fn introspection_rows(&mut self, sql: &str) -> crate::Result<Vec<Vec<PgValue>>> {
        let result = self.simple_query(sql).await?;
        Ok(result.into_iter().filter_map(either::Either::right).map(|row| row.values).collect())
    }

    async fn introspection_row(&mut self, sql: &str) -> crate::Result<Option<Vec<PgValue>>> {
        Ok(self.introspection_rows(sql).await?.into_iter().next())
    }
}

fn enqueue(queue: &mut VecDeque<Oid>, seen: &mut HashSet<Oid>, conn: &PgConnection, oid: Oid) {
    if oid.as_u32() != 0 && !conn.types.is_known(oid) && seen.insert(oid) {
        queue.push_back(oid);
    }
}

fn parse_oid(value: &PgValue) -> Oid {
    value.as_str().and_then(|s| s.parse::<u32>().ok()).map(Oid::new).unwrap_or(Oid::new(0))
}
