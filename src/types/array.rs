//! Binary `ARRAY` wire format (§4.2): an `ndim` header, a declared element OID, one
//! `(length, lower bound)` pair per dimension, then the elements in row-major order.
//!
//! Decoding an element's payload into a [`crate::types::PgValue`] needs the registry (the
//! element OID's codec), so this module only produces the raw per-element bytes; the registry
//! maps them recursively, the same split used for [`crate::types::PgRecord`] and
//! [`crate::types::PgRange`].

use crate::error::err_protocol;
use crate::io::{Buf, BufMut};
use crate::types::Oid;

/// One dimension's bounds, as carried on the wire. PostgreSQL arrays can have an arbitrary
/// non-zero lower bound (`int[3:5]`); a lower bound of `1` is the overwhelmingly common case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PgArrayDimension {
    pub(crate) len: i32,
    pub(crate) lower_bound: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PgArray {
    pub(crate) element_oid: Oid,
    pub(crate) dimensions: Vec<PgArrayDimension>,
    /// Row-major elements; `None` is a SQL `NULL` element.
    pub(crate) elements: Vec<Option<Vec<u8>>>,
}

impl PgArray {
    pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let ndim = buf.get_i32()?;
        let _has_null = buf.get_i32()?;
        let element_oid = Oid(buf.get_u32()?);

        if ndim < 0 {
            return Err(err_protocol!("array dimension count cannot be negative: {ndim}"));
        }

        let dimensions = (0..ndim)
            .map(|_| {
                Ok(PgArrayDimension {
                    len: buf.get_i32()?,
                    lower_bound: buf.get_i32()?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let total: i64 = dimensions.iter().map(|d| d.len as i64).product();
        let total = if ndim == 0 { 0 } else { total };

        let elements = (0..total)
            .map(|_| {
                let len = buf.get_i32()?;
                if len == -1 {
                    Ok(None)
                } else {
                    Ok(Some(buf.get_bytes(len as usize)?.to_vec()))
                }
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(PgArray {
            element_oid,
            dimensions,
            elements,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let has_null = self.elements.iter().any(Option::is_none);

        buf.put_i32(self.dimensions.len() as i32);
        buf.put_i32(has_null as i32);
        buf.put_u32(self.element_oid.as_u32());

        for dim in &self.dimensions {
            buf.put_i32(dim.len);
            buf.put_i32(dim.lower_bound);
        }

        for element in &self.elements {
            match element {
                Some(bytes) => {
                    buf.put_i32(bytes.len() as i32);
                    buf.put_bytes(bytes);
                }
                None => buf.put_i32(-1),
            }
        }
    }

    /// A one-dimensional array with the conventional lower bound of 1.
    pub(crate) fn one_dimensional(element_oid: Oid, elements: Vec<Option<Vec<u8>>>) -> Self {
        let dimensions = if elements.is_empty() {
            Vec::new()
        } else {
            vec![PgArrayDimension {
                len: elements.len() as i32,
                lower_bound: 1,
            }]
        };

        PgArray {
            element_oid,
            dimensions,
            elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_one_dimensional_array_with_a_null() {
        let array = PgArray::one_dimensional(
            Oid(23),
            vec![Some(vec![0, 0, 0, 1]), None, Some(vec![0, 0, 0, 3])],
        );

        let mut buf = Vec::new();
        array.encode(&mut buf);

        assert_eq!(PgArray::decode(&buf).unwrap(), array);
    }

    #[test]
    fn it_round_trips_an_empty_array() {
        let array = PgArray::one_dimensional(Oid(25), Vec::new());

        let mut buf = Vec::new();
        array.encode(&mut buf);

        let decoded = PgArray::decode(&buf).unwrap();
        assert_eq!(decoded, array);
        assert!(decoded.elements.is_empty());
    }

    #[test]
    fn it_round_trips_a_two_dimensional_array() {
        let array = PgArray {
            element_oid: Oid(23),
            dimensions: vec![
                PgArrayDimension { len: 2, lower_bound: 1 },
                PgArrayDimension { len: 2, lower_bound: 1 },
            ],
            elements: vec![
                Some(vec![0, 0, 0, 1]),
                Some(vec![0, 0, 0, 2]),
                Some(vec![0, 0, 0, 3]),
                Some(vec![0, 0, 0, 4]),
            ],
        };

        let mut buf = Vec::new();
        array.encode(&mut buf);

        assert_eq!(PgArray::decode(&buf).unwrap(), array);
    }
}
