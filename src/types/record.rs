//! Binary composite (`ROW`/user-defined composite type) wire format (§4.2).
//!
//! A composite value is a field count followed by `(type_oid, length, bytes)` triples, mirroring
//! `RowDescription` but self-describing per value rather than per statement. Decoding a field's
//! payload into a [`crate::types::PgValue`] needs the registry, so this only carries the raw
//! `(Oid, Option<Vec<u8>>)` pairs; the registry resolves them recursively.

use crate::error::err_protocol;
use crate::io::{Buf, BufMut};
use crate::types::Oid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgRecord {
    pub(crate) fields: Vec<(Oid, Option<Vec<u8>>)>,
}

impl PgRecord {
    pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let count = buf.get_i32()?;
        if count < 0 {
            return Err(err_protocol!("composite field count cannot be negative: {count}"));
        }

        let mut fields = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let oid = Oid(buf.get_u32()?);
            let len = buf.get_i32()?;

            let value = if len == -1 {
                None
            } else {
                Some(buf.get_bytes(len as usize)?.to_vec())
            };

            fields.push((oid, value));
        }

        Ok(Self { fields })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_i32(self.fields.len() as i32);

        for (oid, value) in &self.fields {
            buf.put_u32(oid.as_u32());

            match value {
                Some(bytes) => {
                    buf.put_i32(bytes.len() as i32);
                    buf.put_bytes(bytes);
                }
                None => buf.put_i32(-1),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<(Oid, Option<&[u8]>)> {
        self.fields
            .get(index)
            .map(|(oid, value)| (*oid, value.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_composite_with_a_null_field() {
        let record = PgRecord {
            fields: vec![(Oid(25), Some(b"hello".to_vec())), (Oid(23), None)],
        };

        let mut buf = Vec::new();
        record.encode(&mut buf);

        let decoded = PgRecord::decode(&buf).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.raw(0), Some((Oid(25), Some(&b"hello"[..]))));
        assert_eq!(decoded.raw(1), Some((Oid(23), None)));
    }
}
