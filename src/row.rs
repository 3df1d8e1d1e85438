//! Decoded query results: one row's worth of [`PgValue`]s plus the column metadata shared by
//! every row of the same statement/result set.

use std::sync::Arc;

use crate::error::Error;
use crate::types::{Oid, PgValue};

/// One result column's name and wire type, shared (via `Arc`) across every row of a result set.
#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) type_oid: Oid,
}

/// One row of a query result.
///
/// Columns are addressed either by zero-based index or by name; both paths go through
/// [`PgRow::try_get`]/[`PgRow::try_get_by_name`], which return the already-decoded [`PgValue`]
/// (decoding itself happens once, as the `DataRow` is read off the wire, via the connection's
/// type registry).
#[derive(Debug, Clone)]
pub struct PgRow {
    pub(crate) columns: Arc<[Column]>,
    pub(crate) values: Vec<PgValue>,
}

impl PgRow {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn try_get(&self, index: usize) -> crate::Result<&PgValue> {
        self.values.get(index).ok_or(Error::ColumnIndexOutOfBounds {
            index,
            len: self.values.len(),
        })
    }

    pub fn try_get_by_name(&self, name: &str) -> crate::Result<&PgValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.into()))?;

        self.try_get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::oid;

    fn row() -> PgRow {
        let columns: Arc<[Column]> = Arc::from(vec![
            Column { name: "id".into(), type_oid: oid::INT4 },
            Column { name: "name".into(), type_oid: oid::TEXT },
        ]);
        PgRow { columns, values: vec![PgValue::Int4(1), PgValue::Text("alice".into())] }
    }

    #[test]
    fn try_get_by_name_finds_the_matching_column() {
        let row = row();
        assert_eq!(row.try_get_by_name("name").unwrap().as_str(), Some("alice"));
    }

    #[test]
    fn try_get_by_name_missing_column_is_an_error() {
        let row = row();
        assert!(matches!(row.try_get_by_name("nope"), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn try_get_out_of_bounds_index_is_an_error() {
        let row = row();
        assert!(matches!(row.try_get(5), Err(Error::ColumnIndexOutOfBounds { index: 5, len: 2 })));
    }

    #[test]
    fn column_names_iterates_in_declared_order() {
        let row = row();
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
    }
}
