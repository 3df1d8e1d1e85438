//! Binary wire formats for the fixed-width and text-like scalar built-ins (§4.2).
//!
//! Most of these are a single fixed-width big-endian integer or float and need no dedicated
//! module; they're grouped here rather than split one-file-per-type.

use crate::io::{Buf, BufMut};

pub(crate) fn decode_bool(buf: &[u8]) -> crate::Result<bool> {
    Ok(buf.first().copied().unwrap_or(0) != 0)
}

pub(crate) fn encode_bool(value: bool, buf: &mut Vec<u8>) {
    buf.put_u8(value as u8);
}

pub(crate) fn decode_int2(mut buf: &[u8]) -> crate::Result<i16> {
    buf.get_i16()
}

pub(crate) fn encode_int2(value: i16, buf: &mut Vec<u8>) {
    buf.put_i16(value);
}

pub(crate) fn decode_int4(mut buf: &[u8]) -> crate::Result<i32> {
    buf.get_i32()
}

pub(crate) fn encode_int4(value: i32, buf: &mut Vec<u8>) {
    buf.put_i32(value);
}

pub(crate) fn decode_int8(mut buf: &[u8]) -> crate::Result<i64> {
    buf.get_i64()
}

pub(crate) fn encode_int8(value: i64, buf: &mut Vec<u8>) {
    buf.put_i64(value);
}

pub(crate) fn decode_float4(mut buf: &[u8]) -> crate::Result<f32> {
    buf.get_f32()
}

pub(crate) fn encode_float4(value: f32, buf: &mut Vec<u8>) {
    buf.put_f32(value);
}

pub(crate) fn decode_float8(mut buf: &[u8]) -> crate::Result<f64> {
    buf.get_f64()
}

pub(crate) fn encode_float8(value: f64, buf: &mut Vec<u8>) {
    buf.put_f64(value);
}

/// `TEXT`, `VARCHAR`, `BPCHAR`, `NAME`, and `XML` are all transmitted as raw (non-nul-terminated)
/// UTF-8 in binary mode.
pub(crate) fn decode_text(buf: &[u8]) -> crate::Result<String> {
    std::str::from_utf8(buf)
        .map(str::to_owned)
        .map_err(|e| crate::error::err_protocol!("invalid utf-8 in text value: {e}"))
}

pub(crate) fn encode_text(value: &str, buf: &mut Vec<u8>) {
    buf.put_bytes(value.as_bytes());
}

pub(crate) fn decode_bytea(buf: &[u8]) -> crate::Result<Vec<u8>> {
    Ok(buf.to_vec())
}

pub(crate) fn encode_bytea(value: &[u8], buf: &mut Vec<u8>) {
    buf.put_bytes(value);
}

/// `OID`/`XID`/`CID` are unsigned 32-bit and share a format; `TID` is `(block, offset)`.
pub(crate) fn decode_oid(mut buf: &[u8]) -> crate::Result<u32> {
    buf.get_u32()
}

pub(crate) fn encode_oid(value: u32, buf: &mut Vec<u8>) {
    buf.put_u32(value);
}

pub(crate) fn decode_tid(mut buf: &[u8]) -> crate::Result<(u32, u16)> {
    let block = buf.get_u32()?;
    let offset = buf.get_u16()?;
    Ok((block, offset))
}

pub(crate) fn encode_tid(value: (u32, u16), buf: &mut Vec<u8>) {
    buf.put_u32(value.0);
    buf.put_u16(value.1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_decodes_bool_from_a_nonzero_byte() {
        assert!(decode_bool(&[1]).unwrap());
        assert!(!decode_bool(&[0]).unwrap());
    }

    #[test]
    fn it_round_trips_int4() {
        let mut buf = Vec::new();
        encode_int4(-7, &mut buf);
        assert_eq!(decode_int4(&buf).unwrap(), -7);
    }

    #[test]
    fn it_round_trips_text() {
        let mut buf = Vec::new();
        encode_text("hello, world", &mut buf);
        assert_eq!(decode_text(&buf).unwrap(), "hello, world");
    }

    #[test]
    fn it_round_trips_a_tid() {
        let mut buf = Vec::new();
        encode_tid((42, 3), &mut buf);
        assert_eq!(decode_tid(&buf).unwrap(), (42, 3));
    }
}
